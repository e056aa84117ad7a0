//! Platform glue for native and WASM targets.
//!
//! Native builds drive futures on a tokio runtime, which requires them to be
//! `Send`. On the web everything runs on the browser's single thread via
//! `wasm_bindgen_futures::spawn_local` and futures don't have to be `Send`
//! (reqwest's futures aren't). [`MaybeSend`] and [`BoxedFuture`] hide that
//! difference from the rest of the crate.

use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSend for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSync: Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Sync + ?Sized> MaybeSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSync for T {}

#[cfg(not(target_arch = "wasm32"))]
pub type BoxedFuture<'a, T> = futures::future::BoxFuture<'a, T>;
#[cfg(target_arch = "wasm32")]
pub type BoxedFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;

/// Box a future with the right `Send`-ness for the current target.
pub fn boxed<'a, F>(future: F) -> BoxedFuture<'a, F::Output>
where
    F: Future + MaybeSend + 'a,
{
    Box::pin(future)
}

/// Fire-and-forget a future on the given runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn(runtime: &tokio::runtime::Runtime, future: BoxedFuture<'static, ()>) {
    runtime.spawn(future);
}

/// Fire-and-forget a future on the browser's microtask queue.
#[cfg(target_arch = "wasm32")]
pub fn spawn(future: BoxedFuture<'static, ()>) {
    wasm_bindgen_futures::spawn_local(future);
}

/// Resolve after `duration`. Must be polled from within a tokio runtime on native.
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Resolve after `duration` using `setTimeout`.
#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    use wasm_bindgen::{JsCast, closure::Closure};

    let (tx, rx) = futures::channel::oneshot::channel::<()>();
    let callback = Closure::once(move || {
        let _ = tx.send(());
    });
    let scheduled = web_sys::window().and_then(|window| {
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                duration.as_millis().min(i32::MAX as u128) as i32,
            )
            .ok()
    });
    if scheduled.is_none() {
        log::error!("setTimeout is unavailable, sleep resolves immediately");
        return;
    }
    // The closure has to outlive the timeout.
    callback.forget();
    let _ = rx.await;
}
