//! ログ初期化
//!
//! ライブラリ側は `tracing` マクロのみを使い、購読者はバイナリで初期化する。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` が無ければ verbose に応じた既定フィルタを使う
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "inspection_report=debug"
    } else {
        "inspection_report=info"
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
