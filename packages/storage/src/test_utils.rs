//! Test helpers for isolating storage tests from the real home directory

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers {
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serializes HOME mutation across tests; tokio runs them on multiple threads.
    static HOME_MUTEX: Mutex<()> = Mutex::new(());

    /// Run an async test body with HOME pointed at a fresh temp directory,
    /// so ~/.ragline reads and writes never touch the real filesystem state.
    pub async fn with_temp_home<F, Fut>(test: F)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let _guard = HOME_MUTEX
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let original_home = env::var("HOME").ok();

        env::set_var("HOME", temp_dir.path());

        test().await;

        match original_home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
    }
}
