//! ログ初期化
//!
//! `RUST_LOG` があればそれを優先し、無ければ設定のレベルを使う。
//! 標準出力はスキャン結果に使うため、ログは標準エラーへ出す。

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // テストなどで二重に初期化されても無視する
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// `--verbose` 指定時は設定値より優先して debug にする
pub fn effective_level(configured: &str, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        configured
    }
}
