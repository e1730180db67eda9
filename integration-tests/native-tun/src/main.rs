use std::error::Error;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuntap::{AsyncInterface, Interface, Kind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    test_open_tun()?;
    test_open_tap()?;
    test_async_timeout().await?;

    Ok(())
}

fn test_open_tun() -> Result<(), Box<dyn Error>> {
    info!("test_open_tun");

    let mut tun = Interface::open("tun")?;
    assert_eq!(tun.kind(), Kind::Tun);
    assert_eq!(tun.hw_addr(), None);
    tun.up()?;
    tun.close();
    tun.close();

    Ok(())
}

fn test_open_tap() -> Result<(), Box<dyn Error>> {
    info!("test_open_tap");

    let tap = Interface::open("tap")?;
    let addr = tap.hw_addr().ok_or("missing hardware address")?;
    info!("{} has hardware address {} ({})", tap.name(), addr, addr.to_u64());
    assert_eq!(tap.hardware_address()?, Some(addr));

    // Re-attaching by the bound name reaches the same interface.
    let name = tap.name().to_owned();
    drop(tap);
    let tap = Interface::open(&name)?;
    assert_eq!(tap.name(), name);

    Ok(())
}

async fn test_async_timeout() -> Result<(), Box<dyn Error>> {
    info!("test_async_timeout");

    let mut tun = Interface::open("tun")?;
    tun.set_timeout(Some(Duration::from_millis(200)));
    let tun = AsyncInterface::new(tun)?;
    assert!(matches!(tun.recv(None).await, Err(tuntap::Error::Timeout)));

    Ok(())
}
