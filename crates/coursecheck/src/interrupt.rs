// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Returns a flag set on the first Ctrl-C. The listener runs a
/// single-threaded tokio runtime on its own thread.
pub fn install() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let listener = Arc::clone(&flag);
    let spawned = thread::Builder::new()
        .name("coursecheck-interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::warn!(error = %err, "interrupt listener unavailable");
                    return;
                }
            };
            runtime.block_on(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    listener.store(true, Ordering::SeqCst);
                    tracing::warn!("interrupt received; finishing running passes");
                }
            });
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "interrupt listener thread failed to start");
    }
    flag
}
