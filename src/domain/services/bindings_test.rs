use std::sync::Arc;

use anyhow::Result;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use super::EventBindings;
use crate::domain::models::HostHook;
use crate::domain::models::HostHooks;
use crate::domain::test_support::FakeHooks;

#[test]
fn it_registers_every_hook() {
    let hooks = Arc::new(FakeHooks::default());
    let (tx, _rx) = mpsc::unbounded_channel::<HostHook>();

    EventBindings::new(hooks.clone(), tx).register();

    assert_eq!(hooks.subscribed(), HostHook::iter().collect::<Vec<HostHook>>());
    assert_eq!(hooks.unsubscribe_calls(), 0);
}

#[test]
fn it_rebinds_after_registrations_are_lost() -> Result<()> {
    let hooks = Arc::new(FakeHooks::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<HostHook>();
    let bindings = EventBindings::new(hooks.clone(), tx);

    bindings.register();
    hooks.unsubscribe_all();
    assert!(!hooks.fire(HostHook::SceneOpened));

    bindings.rebind();

    assert_eq!(hooks.unsubscribe_calls(), 2);
    assert!(hooks.fire(HostHook::SceneOpened));
    assert_eq!(rx.try_recv()?, HostHook::SceneOpened);

    return Ok(());
}
