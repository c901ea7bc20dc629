//! ==============================================================================
//! simtemp-cli - user-space client for a running simtemp host
//! ==============================================================================
//!
//! usage:
//!     simtemp-cli [--url URL] demo
//!     simtemp-cli [--url URL] read
//!     simtemp-cli [--url URL] get <attr>
//!     simtemp-cli [--url URL] set <attr> <value>
//!     simtemp-cli [--url URL] ioctl <period|threshold> <value>
//!
//! `demo` configures through attributes, reads five lines one second apart,
//! reconfigures through commands and reads five more.
//!
//! ==============================================================================

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use simtemp::control::{SIMTEMP_IOC_SET_PERIOD, SIMTEMP_IOC_SET_THRESHOLD};

const DEFAULT_URL: &str = "http://127.0.0.1:3000";

struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn read_temp(&self) -> Result<String> {
        let resp = self
            .http
            .get(format!("{}/dev/simtemp", self.base))
            .send()
            .await
            .context("read request failed")?;
        Ok(check(resp).await?.trim().to_string())
    }

    async fn attr_get(&self, attr: &str) -> Result<String> {
        let resp = self
            .http
            .get(format!("{}/sys/class/simtemp/{}", self.base, attr))
            .send()
            .await?;
        Ok(check(resp).await?.trim().to_string())
    }

    async fn attr_set(&self, attr: &str, value: &str) -> Result<()> {
        let resp = self
            .http
            .put(format!("{}/sys/class/simtemp/{}", self.base, attr))
            .body(value.to_string())
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn ioctl(&self, cmd: u32, value: i32) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/ioctl/0x{:08x}", self.base, cmd))
            .body(value.to_le_bytes().to_vec())
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        bail!("{}: {}", status, body.trim());
    }
    Ok(body)
}

fn command_code(name: &str) -> Result<u32> {
    match name {
        "period" => Ok(SIMTEMP_IOC_SET_PERIOD),
        "threshold" => Ok(SIMTEMP_IOC_SET_THRESHOLD),
        other => Err(anyhow!("unknown command '{}' (expected period or threshold)", other)),
    }
}

async fn read_loop(client: &Client, count: usize) -> Result<()> {
    for _ in 0..count {
        println!("{}", client.read_temp().await?);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Ok(())
}

async fn demo(client: &Client) -> Result<()> {
    println!("=== simtemp ===");

    client.attr_set("sampling_period", "1000").await?;
    client.attr_set("alarm_threshold", "30000").await?;
    println!("configured via attributes");
    read_loop(client, 5).await?;

    client.ioctl(SIMTEMP_IOC_SET_PERIOD, 10).await?;
    client.ioctl(SIMTEMP_IOC_SET_THRESHOLD, 20_000).await?;
    println!("configured via commands");
    read_loop(client, 5).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut url = DEFAULT_URL.to_string();
    if let Some(pos) = args.iter().position(|a| a == "--url") {
        if pos + 1 >= args.len() {
            bail!("--url needs a value");
        }
        url = args.remove(pos + 1);
        args.remove(pos);
    }
    let client = Client::new(&url);

    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    match argv.as_slice() {
        [] | ["demo"] => demo(&client).await,
        ["read"] => {
            println!("{}", client.read_temp().await?);
            Ok(())
        }
        ["get", attr] => {
            println!("{}", client.attr_get(attr).await?);
            Ok(())
        }
        ["set", attr, value] => client.attr_set(attr, value).await,
        ["ioctl", name, value] => {
            let value: i32 = value.parse().with_context(|| format!("'{}' is not an integer", value))?;
            client.ioctl(command_code(name)?, value).await
        }
        _ => bail!("usage: simtemp-cli [--url URL] [demo | read | get <attr> | set <attr> <value> | ioctl <period|threshold> <value>]"),
    }
}
