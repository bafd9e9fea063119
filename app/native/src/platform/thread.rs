use std::thread;

/// Spawns a named background thread.
///
/// Thread names are prefixed with `topscroll-` so they are easy to spot in
/// sampling tools. A spawn failure is logged and otherwise ignored.
pub fn spawn_named_thread<F>(name: &str, task: F) -> bool
where F: FnOnce() + Send + 'static {
    let thread_name = format!("topscroll-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(_) => true,
        Err(err) => {
            tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn test_spawned_thread_is_prefixed() {
        let (tx, rx) = mpsc::channel();
        assert!(spawn_named_thread("probe", move || {
            let _ = tx.send(thread::current().name().map(str::to_owned));
        }));
        let name = rx.recv().unwrap();
        assert_eq!(name.as_deref(), Some("topscroll-probe"));
    }
}
