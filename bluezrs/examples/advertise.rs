use std::sync::Arc;
use std::time::Duration;

use bluezrs::util::app_path;
use bluezrs::{AgentManager1, App, LEAdvertisingManager1, ObjectPath, PropertyMap, SimpleAgent, ZbusBus};

#[tokio::main]
async fn main() -> bluezrs::Result<()> {
    let bus = ZbusBus::new().await?;
    let shared = bus.clone().shared();

    let mut app = App::new(shared.clone(), "hci0", app_path("thermometer"), Arc::new(SimpleAgent)).await?;
    app.set_name("Thermometer");

    let agent_path = app.path().child("agent");
    bus.export_agent(&agent_path, Arc::clone(app.agent())).await?;
    let agents = AgentManager1::new(shared.clone(), "org.bluez", ObjectPath::new("/org/bluez")?).await?;
    agents
        .register_agent(agent_path.clone(), app.agent().capability().to_string())
        .await?;

    let advert_path = app.path().child("advertisement0");
    bus.export_advertisement(&advert_path, app.advertisement().clone()).await?;
    let advertising = LEAdvertisingManager1::new(shared, "org.bluez", app.adapter().path().clone()).await?;
    advertising
        .register_advertisement(advert_path.clone(), PropertyMap::new())
        .await?;

    println!("Advertising as {:?} for 60 seconds...", app.advertisement().local_name);
    tokio::time::sleep(Duration::from_secs(60)).await;

    advertising.unregister_advertisement(advert_path.clone()).await?;
    agents.unregister_agent(agent_path.clone()).await?;
    bus.unexport_advertisement(&advert_path).await?;
    bus.unexport_agent(&agent_path).await?;

    Ok(())
}
