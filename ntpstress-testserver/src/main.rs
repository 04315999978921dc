use std::net::SocketAddr;

use ntpstress_testserver::{Behavior, TestServer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut behavior = Behavior::Respond;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--kiss-of-death" => behavior = Behavior::KissOfDeath,
            "--silent" => behavior = Behavior::Silent,
            "--drop-every" => {
                let n = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--drop-every requires a count"))?;
                behavior = Behavior::DropEvery(n.parse()?);
            }
            "-h" | "--help" => {
                eprintln!(
                    "ntpstress-testserver\n\nUSAGE:\n  ntpstress-testserver [--bind 127.0.0.1:0] [--kiss-of-death | --silent | --drop-every N]\n\nOUTPUT:\n  Prints NTP_ADDR=<host:port> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let server = TestServer::bind(bind_addr, behavior).await?;
    println!("NTP_ADDR={}", server.target());

    let _ = tokio::signal::ctrl_c().await;
    eprintln!(
        "requests={} replies={} dropped={}",
        server.stats().requests_total(),
        server.stats().replies_total(),
        server.stats().dropped_total()
    );
    server.shutdown().await;
    Ok(())
}
