//! A scoped fixed-size worker pool.
//!
//! Workers pull boxed jobs off a shared channel; when the pool goes out of
//! scope the channel closes and the scope joins the workers.

use std::sync::{mpsc, Arc, Mutex};

type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

pub struct ThreadPool<'a> {
    sender: mpsc::Sender<Job<'a>>,
    size: usize,
}

impl<'a> ThreadPool<'a> {
    /// Queue a job for the workers; at most `size` run at a time.
    pub fn execute<F: FnOnce() + Send + 'a>(&self, f: F) {
        // The send only fails once every worker has exited, i.e. during
        // pool shutdown, when the job no longer matters.
        let _ = self.sender.send(Box::new(f));
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Run `f` with a pool of `size` (at least 1) worker threads scoped to this
/// call; jobs may borrow from the caller's environment.
pub fn scoped<'env, T, F: FnOnce(&ThreadPool<'env>) -> T>(size: usize, f: F) -> T {
    let size = size.max(1);
    std::thread::scope(|s| {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        for _ in 0..size {
            let receiver = Arc::clone(&receiver);
            s.spawn(move || loop {
                let job = receiver.lock().unwrap().recv();
                match job {
                    Ok(job) => job(),
                    Err(_) => break,
                }
            });
        }

        let pool: ThreadPool<'env> = ThreadPool { sender, size };
        f(&pool)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_all_jobs() {
        let count = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        scoped(3, |pool| {
            for _ in 0..10 {
                let tx = tx.clone();
                let count = &count;
                pool.execute(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                    tx.send(()).unwrap();
                });
            }
            for _ in 0..10 {
                rx.recv().unwrap();
            }
        });
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn zero_size_clamps_to_one() {
        let ran = scoped(0, |pool| {
            assert_eq!(pool.size(), 1);
            let (tx, rx) = mpsc::channel();
            pool.execute(move || tx.send(true).unwrap());
            rx.recv().unwrap()
        });
        assert!(ran);
    }
}
