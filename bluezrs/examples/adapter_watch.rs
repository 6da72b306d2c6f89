use bluezrs::{Adapter1, ObjectManagerEvent, ObjectPath, ZbusBus};

#[tokio::main]
async fn main() -> bluezrs::Result<()> {
    let bus = ZbusBus::new().await?.shared();
    let adapter = Adapter1::new(bus, "org.bluez", ObjectPath::adapter("hci0")).await?;

    let props = adapter.to_props().await;
    println!("{} ({}) powered: {}", props.alias, props.address, props.powered);

    if !props.powered {
        adapter.set_powered(true).await?;
    }

    let (devices, cancel) = adapter.object_manager_signal().await?;
    adapter.start_discovery().await?;

    println!("Discovering for 30 seconds...");
    let discovery = async {
        while let Some(event) = devices.recv().await {
            match event {
                ObjectManagerEvent::InterfacesAdded { path, .. } => println!("+ {path}"),
                ObjectManagerEvent::InterfacesRemoved { path, .. } => println!("- {path}"),
            }
        }
    };
    let _ = tokio::time::timeout(std::time::Duration::from_secs(30), discovery).await;

    cancel();
    adapter.stop_discovery().await?;
    adapter.close();

    Ok(())
}
