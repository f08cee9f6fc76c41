use anyhow::Result;


/// Reminder evaluation is cooperative, one timer drives it. The daemon doesn't need more than a
/// single thread.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
