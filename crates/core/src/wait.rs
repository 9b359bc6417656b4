//! Blocking on futures from synchronous code.

use futures::task::{waker, ArcWake};
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, Thread};

struct Unpark(Thread);

impl ArcWake for Unpark {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.unpark();
    }
}

/// Run `future` to completion on the current thread.
///
/// Unlike `futures::executor::block_on` this may be nested: a synchronous
/// advice inside an asynchronous layer that is itself being waited on can
/// wait again.
pub fn wait<F: Future>(future: F) -> F::Output {
    let waker = waker(Arc::new(Unpark(thread::current())));
    let mut cx = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        thread::park();
    }
}
