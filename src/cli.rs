use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "receipt-scan")]
#[command(about = "レシート画像から店舗・明細・合計を抽出するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// HTTPサーバーを起動
    Serve {
        /// 待ち受けポート（省略時は設定値）
        #[arg(short, long)]
        port: Option<u16>,

        /// 待ち受けアドレス（省略時は設定値）
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// レシート画像をスキャンして結果を表示
    Scan {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 使用するモデル（省略時は設定値）
        #[arg(short, long)]
        model: Option<String>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// JSON出力に送信画像のプレビュー（Data URL）を含める
        #[arg(long, requires = "json")]
        preview: bool,
    },

    /// 選択可能なモデルを一覧表示
    Models,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
