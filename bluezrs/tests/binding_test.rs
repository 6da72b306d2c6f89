//! Binding behaviour against the in-memory daemon.

use std::collections::BTreeMap;
use std::time::Duration;

use bluezrs::mock::MockBus;
use bluezrs::types::constants::{error_name, interface};
use bluezrs::{
    Adapter1, Adapter1Properties, AgentManager1, BluezError, Device1, GattCharacteristic1,
    GattProfile1, ObjectManagerEvent, ObjectPath, PropertiesRecord, PropertyMap, WireValue,
};

const ADDRESS: &str = "00:1A:7D:DA:71:13";

fn adapter_props() -> PropertyMap {
    let mut props = PropertyMap::new();
    props.insert("Address".into(), WireValue::Str(ADDRESS.into()));
    props.insert("AddressType".into(), WireValue::Str("public".into()));
    props.insert("Name".into(), WireValue::Str("workstation".into()));
    props.insert("Alias".into(), WireValue::Str("workstation".into()));
    props.insert("Class".into(), WireValue::UInt32(0x7c010c));
    props.insert("Powered".into(), WireValue::Bool(false));
    props.insert("Discoverable".into(), WireValue::Bool(false));
    props.insert("DiscoverableTimeout".into(), WireValue::UInt32(180));
    props.insert("Pairable".into(), WireValue::Bool(true));
    props.insert("PairableTimeout".into(), WireValue::UInt32(0));
    props.insert("Discovering".into(), WireValue::Bool(false));
    props.insert(
        "UUIDs".into(),
        WireValue::StrList(vec!["0000110e-0000-1000-8000-00805f9b34fb".into()]),
    );
    props.insert("Roles".into(), WireValue::StrList(vec!["central".into()]));
    props
}

fn setup() -> (MockBus, ObjectPath) {
    let mock = MockBus::new();
    let path = ObjectPath::adapter("hci0");
    mock.add_object(&path, interface::ADAPTER, adapter_props());
    (mock, path)
}

async fn adapter(mock: &MockBus, path: &ObjectPath) -> Adapter1 {
    Adapter1::new(mock.shared(), "org.bluez", path.clone())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_construction_fetches_all_properties() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let fetched = adapter.get_properties().await.unwrap();
    assert_eq!(fetched.to_map(), adapter_props());
    assert_eq!(adapter.to_props().await, fetched);
    assert_eq!(fetched.address, ADDRESS);
    assert_eq!(fetched.class, 0x7c010c);
    assert_eq!(fetched.modalias, None);
}

#[tokio::test]
async fn test_accessors() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    assert_eq!(adapter.path(), &path);
    assert_eq!(adapter.interface(), "org.bluez.Adapter1");
    assert_eq!(adapter.service(), "org.bluez");
    assert!(adapter.property_watch().is_none());
    assert!(!adapter.is_closed());
}

#[tokio::test]
async fn test_construction_on_missing_object_is_connection_error() {
    let mock = MockBus::new();
    let err = Adapter1::new(mock.shared(), "org.bluez", ObjectPath::adapter("hci7"))
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::Connection(_)), "{err:?}");
}

#[tokio::test]
async fn test_construction_on_unreachable_bus_is_connection_error() {
    let (mock, path) = setup();
    mock.set_unreachable(true);
    let err = Adapter1::new(mock.shared(), "org.bluez", path).await.unwrap_err();
    assert!(matches!(err, BluezError::Connection(_)), "{err:?}");
}

#[tokio::test]
async fn test_construction_rejects_unknown_keys() {
    let (mock, path) = setup();
    let mut props = adapter_props();
    props.insert("Frobnicated".into(), WireValue::Bool(true));
    mock.add_object(&path, interface::ADAPTER, props);

    let err = Adapter1::new(mock.shared(), "org.bluez", path).await.unwrap_err();
    assert!(matches!(err, BluezError::UnknownProperty { .. }), "{err:?}");
}

#[tokio::test]
async fn test_typed_getter_and_setter() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    assert_eq!(adapter.get_address().await.unwrap(), ADDRESS);
    assert!(!adapter.get_powered().await.unwrap());

    adapter.set_powered(true).await.unwrap();
    assert!(adapter.get_powered().await.unwrap());
    assert_eq!(
        mock.property(&path, interface::ADAPTER, "Powered"),
        Some(WireValue::Bool(true))
    );
}

#[tokio::test]
async fn test_unset_optional_property_is_not_found() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter.get_modalias().await.unwrap_err();
    assert!(matches!(err, BluezError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn test_set_unknown_property_is_not_found() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter
        .set_property("Frobnicated", WireValue::Bool(true))
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::NotFound(_)), "{err:?}");
    assert_eq!(mock.property(&path, interface::ADAPTER, "Frobnicated"), None);
}

#[tokio::test]
async fn test_set_read_only_property_is_permission_error() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter
        .set_property("Address", WireValue::Str("11:22:33:44:55:66".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::Permission(_)), "{err:?}");
    assert_eq!(
        mock.property(&path, interface::ADAPTER, "Address"),
        Some(WireValue::Str(ADDRESS.into()))
    );
}

#[tokio::test]
async fn test_set_with_wrong_type_is_type_mismatch() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter
        .set_property("Powered", WireValue::Str("yes".into()))
        .await
        .unwrap_err();
    match err {
        BluezError::TypeMismatch {
            property,
            expected,
            found,
        } => {
            assert_eq!(property, "Powered");
            assert_eq!(expected, "b");
            assert_eq!(found, "s");
        }
        other => panic!("expected type mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_daemon_rejected_write_is_permission_error() {
    let (mock, path) = setup();
    mock.reject_writes(&path, interface::ADAPTER, "Discoverable");
    let adapter = adapter(&mock, &path).await;

    let err = adapter.set_discoverable(true).await.unwrap_err();
    assert!(matches!(err, BluezError::Permission(_)), "{err:?}");
}

#[tokio::test]
async fn test_method_call_sends_arguments() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let device = path.device("C8:1F:E8:F0:51:57");

    adapter.start_discovery().await.unwrap();
    adapter.remove_device(device.clone()).await.unwrap();

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "StartDiscovery");
    assert!(calls[0].args.is_empty());
    assert_eq!(calls[1].method, "RemoveDevice");
    assert_eq!(calls[1].args, vec![WireValue::ObjectPath(device)]);
}

#[tokio::test]
async fn test_method_reply_is_decoded() {
    let (mock, path) = setup();
    mock.set_reply(
        &path,
        interface::ADAPTER,
        "GetDiscoveryFilters",
        Some(WireValue::StrList(vec!["UUIDs".into(), "RSSI".into()])),
    );
    let adapter = adapter(&mock, &path).await;

    assert_eq!(
        adapter.get_discovery_filters().await.unwrap(),
        vec!["UUIDs".to_string(), "RSSI".to_string()]
    );
}

#[tokio::test]
async fn test_method_reply_of_wrong_type_is_rejected() {
    let (mock, path) = setup();
    mock.set_reply(
        &path,
        interface::ADAPTER,
        "GetDiscoveryFilters",
        Some(WireValue::Str("UUIDs".into())),
    );
    let adapter = adapter(&mock, &path).await;

    let err = adapter.get_discovery_filters().await.unwrap_err();
    assert!(matches!(err, BluezError::TypeMismatch { .. }), "{err:?}");
}

#[tokio::test]
async fn test_method_error_is_propagated_verbatim() {
    let (mock, path) = setup();
    mock.set_error(
        &path,
        interface::ADAPTER,
        "StartDiscovery",
        "org.bluez.Error.InProgress",
        "Operation already in progress",
    );
    let adapter = adapter(&mock, &path).await;

    match adapter.start_discovery().await.unwrap_err() {
        BluezError::Method { name, message } => {
            assert_eq!(name, "org.bluez.Error.InProgress");
            assert_eq!(message, "Operation already in progress");
        }
        other => panic!("expected method error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_method_and_bad_arguments() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter.call("SelfDestruct", vec![]).await.unwrap_err();
    assert!(matches!(err, BluezError::NotFound(_)), "{err:?}");

    let err = adapter
        .call("RemoveDevice", vec![WireValue::Str("dev".into())])
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::TypeMismatch { .. }), "{err:?}");

    let err = adapter.call("RemoveDevice", vec![]).await.unwrap_err();
    assert!(matches!(err, BluezError::TypeMismatch { .. }), "{err:?}");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_watch_is_idempotent() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let first = adapter.watch_properties().await.unwrap();
    let second = adapter.watch_properties().await.unwrap();
    assert!(first.same_channel(&second));
    assert!(adapter.property_watch().unwrap().same_channel(&first));
    assert_eq!(mock.property_subscriptions(), 1);
}

#[tokio::test]
async fn test_watch_applies_changes_to_record() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let watch = adapter.watch_properties().await.unwrap();

    let mut changed = PropertyMap::new();
    changed.insert("Powered".into(), WireValue::Bool(true));
    mock.emit_properties_changed(&path, interface::ADAPTER, changed, vec![])
        .await;

    let change = watch.recv().await.unwrap();
    assert_eq!(change.name, "Powered");
    assert_eq!(change.value, Some(WireValue::Bool(true)));
    assert_eq!(change.path, path);
    assert!(adapter.properties().read().await.powered);
}

#[tokio::test]
async fn test_watch_handles_invalidation_and_skips_bad_entries() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let watch = adapter.watch_properties().await.unwrap();

    // Another interface on the same object is ignored.
    let mut other = PropertyMap::new();
    other.insert("Connected".into(), WireValue::Bool(true));
    mock.emit_properties_changed(&path, interface::DEVICE, other, vec![])
        .await;

    let mut changed = PropertyMap::new();
    changed.insert("Frobnicated".into(), WireValue::Bool(true));
    changed.insert("Discovering".into(), WireValue::Str("yes".into()));
    changed.insert("Alias".into(), WireValue::Str("desk".into()));
    mock.emit_properties_changed(&path, interface::ADAPTER, changed, vec!["Roles".into()])
        .await;

    let alias = watch.recv().await.unwrap();
    assert_eq!(alias.name, "Alias");
    let roles = watch.recv().await.unwrap();
    assert_eq!(roles.name, "Roles");
    assert!(roles.is_invalidated());

    let record = adapter.to_props().await;
    assert_eq!(record.alias, "desk");
    assert!(record.roles.is_empty());
    assert!(!record.discovering);
}

#[tokio::test]
async fn test_unwatch_ends_the_channel() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let watch = adapter.watch_properties().await.unwrap();

    adapter.unwatch_properties();
    assert!(watch.recv().await.is_none());
    assert!(adapter.property_watch().is_none());
    assert_eq!(mock.property_subscriptions(), 0);

    let fresh = adapter.watch_properties().await.unwrap();
    assert!(!fresh.same_channel(&watch));
}

#[tokio::test]
async fn test_close_cancels_everything() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let watch = adapter.watch_properties().await.unwrap();
    let (om_watch, _cancel) = adapter.object_manager_signal().await.unwrap();

    let mut changed = PropertyMap::new();
    changed.insert("Powered".into(), WireValue::Bool(true));
    mock.emit_properties_changed(&path, interface::ADAPTER, changed, vec![])
        .await;

    adapter.close();
    assert!(adapter.is_closed());
    assert!(watch.recv().await.is_none());
    assert!(om_watch.recv().await.is_none());
    assert_eq!(mock.property_subscriptions(), 0);
    assert_eq!(mock.object_manager_subscriptions(), 0);

    adapter.close();
    assert!(matches!(
        adapter.get_powered().await,
        Err(BluezError::Closed)
    ));
    assert!(matches!(
        adapter.watch_properties().await,
        Err(BluezError::Closed)
    ));
}

#[tokio::test]
async fn test_drop_releases_subscriptions() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;
    let watch = adapter.watch_properties().await.unwrap();
    assert_eq!(mock.property_subscriptions(), 1);

    drop(adapter);
    assert_eq!(mock.property_subscriptions(), 0);
    assert!(watch.recv().await.is_none());
}

fn added(iface: &str) -> BTreeMap<String, PropertyMap> {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(iface.to_string(), PropertyMap::new());
    interfaces
}

#[tokio::test]
async fn test_object_manager_signal_filters_and_cancels() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let (watch, cancel) = adapter.object_manager_signal().await.unwrap();
    let (again, _) = adapter.object_manager_signal().await.unwrap();
    assert!(watch.same_channel(&again));
    assert_eq!(mock.object_manager_subscriptions(), 1);

    let own_device = path.device("C8:1F:E8:F0:51:57");
    let other_adapter = ObjectPath::adapter("hci1");
    let foreign_device = other_adapter.device("AA:BB:CC:DD:EE:FF");

    mock.emit_interfaces_added(&foreign_device, added(interface::DEVICE))
        .await;
    mock.emit_interfaces_added(&own_device, added(interface::DEVICE))
        .await;
    mock.emit_interfaces_added(&other_adapter, added(interface::ADAPTER))
        .await;
    mock.emit_interfaces_removed(&own_device, vec![interface::DEVICE.into()])
        .await;

    match watch.recv().await.unwrap() {
        ObjectManagerEvent::InterfacesAdded { path, interfaces } => {
            assert_eq!(path, own_device);
            assert!(interfaces.contains_key(interface::DEVICE));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(watch.recv().await.unwrap().path(), &other_adapter);
    assert!(matches!(
        watch.recv().await.unwrap(),
        ObjectManagerEvent::InterfacesRemoved { .. }
    ));

    cancel();
    assert!(watch.recv().await.is_none());
    assert_eq!(mock.object_manager_subscriptions(), 0);

    let (fresh, _) = adapter.object_manager_signal().await.unwrap();
    assert!(!fresh.same_channel(&watch));
}

#[tokio::test]
async fn test_stale_cancel_leaves_newer_watch_alone() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let (first, cancel_first) = adapter.object_manager_signal().await.unwrap();
    let (_, cancel_again) = adapter.object_manager_signal().await.unwrap();
    cancel_first();
    assert!(!first.is_active());

    let (second, _) = adapter.object_manager_signal().await.unwrap();
    cancel_again();
    assert!(second.is_active());
    assert_eq!(mock.object_manager_subscriptions(), 1);
}

#[tokio::test]
async fn test_object_manager_enumeration() {
    let (mock, path) = setup();
    let device = path.device("C8:1F:E8:F0:51:57");
    let mut device_props = PropertyMap::new();
    device_props.insert("Address".into(), WireValue::Str("C8:1F:E8:F0:51:57".into()));
    mock.add_object(&device, interface::DEVICE, device_props);
    mock.add_object(&ObjectPath::adapter("hci1"), interface::ADAPTER, adapter_props());

    let adapter = adapter(&mock, &path).await;
    let om = adapter.object_manager();

    assert_eq!(
        om.adapters().await.unwrap(),
        vec![path.clone(), ObjectPath::adapter("hci1")]
    );
    assert_eq!(om.devices(&path).await.unwrap(), vec![device.clone()]);
    assert!(om.devices(&ObjectPath::adapter("hci1")).await.unwrap().is_empty());

    let tree = om.managed_objects().await.unwrap();
    let record = Adapter1Properties::from_map(&tree[&path][interface::ADAPTER]).unwrap();
    assert_eq!(record.address, ADDRESS);

    let bound = Device1::new(mock.shared(), "org.bluez", device).await.unwrap();
    assert_eq!(bound.to_props().await.address, "C8:1F:E8:F0:51:57");
}

#[tokio::test]
async fn test_wait_for_property_sees_change() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let (reached, written) = tokio::join!(
        adapter.wait_for_property(
            "Powered",
            |v| v == &WireValue::Bool(true),
            Duration::from_secs(5)
        ),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            adapter.set_powered(true).await
        }
    );
    written.unwrap();
    assert_eq!(reached.unwrap(), WireValue::Bool(true));
}

#[tokio::test]
async fn test_wait_for_property_returns_current_value() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let value = adapter
        .wait_for_property("Pairable", |v| v.as_bool() == Some(true), Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(value, WireValue::Bool(true));
}

#[tokio::test]
async fn test_wait_for_property_times_out() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let err = adapter
        .wait_for_property("Powered", |v| v.as_bool() == Some(true), Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::Timeout));
    assert_eq!(mock.property_subscriptions(), 0);
}

#[tokio::test]
async fn test_close_ends_a_pending_wait() {
    let (mock, path) = setup();
    let adapter = adapter(&mock, &path).await;

    let (waited, ()) = tokio::join!(
        adapter.wait_for_property(
            "Powered",
            |v| v == &WireValue::Bool(true),
            Duration::from_secs(30)
        ),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            adapter.close();
        }
    );
    assert!(matches!(waited, Err(BluezError::Closed)), "{waited:?}");
    assert_eq!(mock.property_subscriptions(), 0);

    let err = adapter
        .wait_for_property("Powered", |_| true, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, BluezError::Closed));
}

#[tokio::test]
async fn test_property_less_interfaces() {
    let mock = MockBus::new();
    let root = ObjectPath::new("/org/bluez").unwrap();
    mock.add_object(&root, interface::AGENT_MANAGER, PropertyMap::new());
    let agent_path = ObjectPath::new("/org/example/agent").unwrap();

    let manager = AgentManager1::new(mock.shared(), "org.bluez", root).await.unwrap();
    manager
        .register_agent(agent_path.clone(), "NoInputNoOutput".into())
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls[0].method, "RegisterAgent");
    assert_eq!(
        calls[0].args,
        vec![
            WireValue::ObjectPath(agent_path),
            WireValue::Str("NoInputNoOutput".into())
        ]
    );
}

#[tokio::test]
async fn test_gatt_profile_uuids_round_trip() {
    let mock = MockBus::new();
    let path = ObjectPath::new("/org/example/app/profile0").unwrap();
    let mut props = PropertyMap::new();
    props.insert("UUIDs".into(), WireValue::StrList(vec![]));
    mock.add_object_on("org.example.App", &path, interface::GATT_PROFILE, props);

    let profile = GattProfile1::new(mock.shared(), "org.example.App", path.clone())
        .await
        .unwrap();
    let watch = profile.watch_properties().await.unwrap();

    let uuids = vec!["0000180d-0000-1000-8000-00805f9b34fb".to_string()];
    profile.set_uuids(uuids.clone()).await.unwrap();

    let change = watch.recv().await.unwrap();
    assert_eq!(change.name, "UUIDs");
    assert_eq!(profile.to_props().await.uuids, uuids);
    assert_eq!(profile.get_uuids().await.unwrap(), uuids);
}

#[tokio::test]
async fn test_characteristic_read_and_write() {
    let mock = MockBus::new();
    let path = ObjectPath::new("/org/bluez/hci0/dev_C8_1F_E8_F0_51_57/service0010/char0011").unwrap();
    let mut props = PropertyMap::new();
    props.insert("UUID".into(), WireValue::Str("00002a37-0000-1000-8000-00805f9b34fb".into()));
    props.insert(
        "Service".into(),
        WireValue::ObjectPath(path.parent().unwrap()),
    );
    props.insert("Flags".into(), WireValue::StrList(vec!["read".into(), "write".into()]));
    mock.add_object(&path, interface::GATT_CHARACTERISTIC, props);
    mock.set_reply(
        &path,
        interface::GATT_CHARACTERISTIC,
        "ReadValue",
        Some(WireValue::Bytes(vec![0x06, 0x48])),
    );

    let chr = GattCharacteristic1::new(mock.shared(), "org.bluez", path).await.unwrap();
    assert_eq!(chr.read_value(PropertyMap::new()).await.unwrap(), vec![0x06, 0x48]);

    let mut options = PropertyMap::new();
    options.insert("type".into(), WireValue::Str("request".into()));
    chr.write_value(vec![0x01], options.clone()).await.unwrap();

    let write = mock.calls().pop().unwrap();
    assert_eq!(write.method, "WriteValue");
    assert_eq!(
        write.args,
        vec![WireValue::Bytes(vec![0x01]), WireValue::Dict(options)]
    );
}

#[tokio::test]
async fn test_pair_refusal_keeps_daemon_error_name() {
    let (mock, path) = setup();
    let device = path.device("C8:1F:E8:F0:51:57");
    let mut props = PropertyMap::new();
    props.insert("Address".into(), WireValue::Str("C8:1F:E8:F0:51:57".into()));
    mock.add_object(&device, interface::DEVICE, props);
    mock.set_error(
        &device,
        interface::DEVICE,
        "Pair",
        error_name::BLUEZ_NOT_AUTHORIZED,
        "Not authorized",
    );

    let device = Device1::new(mock.shared(), "org.bluez", device).await.unwrap();
    match device.pair().await.unwrap_err() {
        BluezError::Method { name, message } => {
            assert_eq!(name, "org.bluez.Error.NotAuthorized");
            assert_eq!(message, "Not authorized");
        }
        other => panic!("expected method error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_remove_device_error_is_not_reclassified() {
    let (mock, path) = setup();
    mock.set_error(
        &path,
        interface::ADAPTER,
        "RemoveDevice",
        error_name::BLUEZ_DOES_NOT_EXIST,
        "Does Not Exist",
    );
    let adapter = adapter(&mock, &path).await;

    let err = adapter
        .remove_device(path.device("AA:BB:CC:DD:EE:FF"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, BluezError::Method { name, .. } if name == "org.bluez.Error.DoesNotExist"),
        "{err:?}"
    );

    mock.remove_object(&path);
    let err = adapter.stop_discovery().await.unwrap_err();
    assert!(
        matches!(&err, BluezError::Method { name, .. } if name == "org.freedesktop.DBus.Error.UnknownObject"),
        "{err:?}"
    );
}
