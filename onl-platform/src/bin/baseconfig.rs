//! Command-line entry point for platform bring-up.
//!
//! `onl-baseconfig baseconfig` is what the boot unit runs. The other
//! subcommands describe the platform without touching the hardware.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::{env, fmt::Write, process::ExitCode};

use onl_platform::{
    config::Config,
    host::{Action, DryRun, LinuxSystem},
    platform::{self, Platform, PlatformInfo, PlatformRegistry},
    topology::{client_name, I2cDevice, Port, PORT_EEPROM_ADDR},
    tracing::{self, prelude::*},
};

#[derive(Parser, Debug)]
#[command(name = "onl-baseconfig", version, about = "Accton switch platform bring-up")]
struct Cli {
    /// Platform identifier [default: $ONL_PLATFORM, then /etc/onl/platform]
    #[arg(long, global = true)]
    platform: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load drivers and register devices for this platform
    Baseconfig {
        /// Print what would be done instead of doing it
        #[arg(long)]
        dry_run: bool,

        /// With --dry-run, print the plan as JSON
        #[arg(long, requires = "dry_run")]
        json: bool,
    },
    /// List supported platforms
    List,
    /// Describe a platform's identity and I2C topology
    Show {
        #[arg(long)]
        json: bool,
    },
    /// List transceiver ports and their EEPROM paths
    Ports,
}

#[derive(Serialize)]
struct Description<'a> {
    #[serde(flatten)]
    info: &'a PlatformInfo,
    object_id: String,
    i2c_devices: Vec<I2cDevice>,
    ports: Vec<Port>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing::init_journald_or_stdout(cli.verbose);

    let result = match Config::load().context("invalid environment") {
        Ok(config) => run(cli, &config, env::var("ONL_PLATFORM").ok()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    ExitCode::from(exit_status(&result))
}

fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

async fn run(cli: Cli, config: &Config, env_platform: Option<String>) -> Result<()> {
    trace!(?config, "Loaded configuration");

    if let Command::List = cli.command {
        print!("{}", render_list());
        return Ok(());
    }

    let id = platform::resolve_platform_id(
        cli.platform.as_deref(),
        env_platform.as_deref(),
        config,
    )?;
    let platform = PlatformRegistry.create(&id)?;

    match cli.command {
        Command::Baseconfig { dry_run: false, .. } => {
            let mut sys = LinuxSystem::new();
            platform::run_baseconfig(platform.as_ref(), &mut sys, config)
                .await
                .with_context(|| format!("baseconfig failed for {}", id))
        }
        Command::Baseconfig { dry_run: true, json } => {
            let (actions, result) = dry_run(platform.as_ref(), config).await;
            print!("{}", render_plan(&actions, json)?);
            result.with_context(|| format!("dry run stopped early for {}", id))
        }
        Command::Show { json } => {
            print!("{}", render_show(platform.as_ref(), json)?);
            Ok(())
        }
        Command::Ports => {
            if platform.ports().is_empty() {
                warn!(platform = %id, "No I2C transceiver ports");
            }
            print!("{}", render_ports(platform.as_ref(), config));
            Ok(())
        }
        Command::List => Ok(()),
    }
}

/// Run bring-up against a recording host, returning what it would have done.
async fn dry_run(
    platform: &dyn Platform,
    config: &Config,
) -> (Vec<Action>, onl_platform::error::Result<()>) {
    let mut sys = DryRun::new(config);
    let result = platform::run_baseconfig(platform, &mut sys, config).await;
    (sys.into_actions(), result)
}

fn render_plan(actions: &[Action], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(actions)? + "\n");
    }
    let mut out = String::new();
    for action in actions {
        writeln!(out, "{}", action)?;
    }
    Ok(out)
}

fn render_list() -> String {
    let mut out = String::new();
    for desc in PlatformRegistry.all() {
        let platform = (desc.create_fn)();
        let info = platform.info();
        let _ = writeln!(out, "{:<32} {:<14} {}", info.id, info.model, info.port_config);
    }
    out
}

fn describe(platform: &dyn Platform) -> Description<'static> {
    let info = platform.info();
    Description {
        info,
        object_id: info.object_id(),
        i2c_devices: platform.i2c_devices(),
        ports: platform.ports(),
    }
}

fn render_show(platform: &dyn Platform, json: bool) -> Result<String> {
    let description = describe(platform);
    if json {
        return Ok(serde_json::to_string_pretty(&description)? + "\n");
    }

    let info = description.info;
    let mut out = String::new();
    writeln!(out, "Platform:     {}", info.id)?;
    writeln!(out, "Model:        {} {}", info.manufacturer, info.model)?;
    writeln!(out, "Object ID:    {}", description.object_id)?;
    writeln!(out, "Ports:        {}", info.port_config)?;
    writeln!(out, "I2C devices:")?;
    for dev in &description.i2c_devices {
        writeln!(out, "  {:<10} {:<24} 0x{:02x}", dev.client_name(), dev.driver, dev.addr)?;
    }
    if description.ports.is_empty() {
        writeln!(out, "Transceiver EEPROMs are not on I2C.")?;
    } else {
        writeln!(out, "Transceivers:")?;
        for port in &description.ports {
            let client = client_name(port.bus, PORT_EEPROM_ADDR);
            writeln!(out, "  {:<7} {:<10} {}", port.name(), client, port.eeprom)?;
        }
    }
    Ok(out)
}

fn render_ports(platform: &dyn Platform, config: &Config) -> String {
    let mut out = String::new();
    for port in platform.ports() {
        let eeprom = config
            .sysfs_root
            .join("bus/i2c/devices")
            .join(client_name(port.bus, PORT_EEPROM_ADDR))
            .join("eeprom");
        let _ = writeln!(
            out,
            "{:<7} bus {:<3} {} {}",
            port.name(),
            port.bus,
            port.eeprom,
            eeprom.display()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use onl_platform::host::linux;
    use std::path::Path;

    const ES7636BT4: &str = "x86-64-accton-es7636bt4-r0";
    const AS9736_64D: &str = "x86-64-accton-as9736-64d-r0";

    fn scratch_config(dir: &Path) -> Config {
        Config {
            sysfs_root: dir.join("sys"),
            dev_root: dir.join("dev"),
            modules_root: dir.join("lib/modules"),
            platform_file: dir.join("platform"),
            ..Config::default()
        }
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("onl-baseconfig").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_json_requires_dry_run() {
        assert!(Cli::try_parse_from(["onl-baseconfig", "baseconfig", "--json"]).is_err());
        let parsed = cli(&["baseconfig", "--dry-run", "--json", "-vv"]);
        assert_eq!(parsed.verbose, 2);
        assert!(matches!(parsed.command, Command::Baseconfig { dry_run: true, json: true }));
    }

    #[tokio::test]
    async fn test_dry_run_succeeds_with_exit_status_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path());
        let args = cli(&["--platform", ES7636BT4, "baseconfig", "--dry-run"]);

        let result = run(args, &config, None).await;

        assert_eq!(exit_status(&result), 0);
    }

    #[tokio::test]
    async fn test_failed_bring_up_exits_with_status_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path());
        // An installed but empty module tree: platform modules are missing.
        let release = linux::kernel_release().unwrap();
        std::fs::create_dir_all(config.modules_root.join(release)).unwrap();
        let args = cli(&["--platform", ES7636BT4, "baseconfig", "--dry-run"]);

        let result = run(args, &config, None).await;

        assert_eq!(exit_status(&result), 1);
    }

    #[tokio::test]
    async fn test_unknown_platform_exits_with_status_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path());

        let result = run(cli(&["show"]), &config, Some("x86-64-nobody-r0".into())).await;

        assert_eq!(exit_status(&result), 1);
    }

    #[tokio::test]
    async fn test_dry_run_plan_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path());
        let platform = PlatformRegistry.create(AS9736_64D).unwrap();

        let (actions, result) = dry_run(platform.as_ref(), &config).await;
        result.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_plan(&actions, true).unwrap()).unwrap();

        let plan = json.as_array().unwrap();
        assert_eq!(plan.len(), actions.len());
        assert_eq!(plan[0]["action"], "run");
        assert_eq!(plan[0]["program"], "insmod");
        let last = plan.last().unwrap();
        assert_eq!(last["action"], "write");
        assert_eq!(last["contents"], "as973d_64d_sys 0x51\n");
        assert_eq!(
            last["path"],
            dir.path().join("sys/bus/i2c/devices/i2c-20/new_device").display().to_string()
        );
    }

    #[test]
    fn test_plan_as_text() {
        let actions = [
            Action::Run {
                program: "modprobe".into(),
                args: vec!["optoe".into()],
            },
            Action::Write {
                path: "/sys/bus/i2c/devices/i2c-0/new_device".into(),
                contents: "pca9548 0x72\n".into(),
            },
        ];

        assert_eq!(
            render_plan(&actions, false).unwrap(),
            "modprobe optoe\necho \"pca9548 0x72\" > /sys/bus/i2c/devices/i2c-0/new_device\n"
        );
    }

    #[test]
    fn test_show_json_flattens_platform_info() {
        let platform = PlatformRegistry.create(ES7636BT4).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_show(platform.as_ref(), true).unwrap()).unwrap();

        assert_eq!(json["id"], ES7636BT4);
        assert_eq!(json["model"], "IXR7220-D4");
        assert_eq!(json["port_config"], "8x400 + 28x100");
        assert_eq!(json["object_id"], ".1.3.6.1.4.1.259.7220.D4");
        assert!(json.get("info").is_none());
        assert_eq!(json["i2c_devices"][0]["driver"], "pca9548");
        assert_eq!(json["ports"].as_array().unwrap().len(), 36);
        assert_eq!(json["ports"][0]["eeprom"], "optoe1");
    }

    #[test]
    fn test_show_text_without_i2c_ports() {
        let platform = PlatformRegistry.create(AS9736_64D).unwrap();
        let text = render_show(platform.as_ref(), false).unwrap();

        assert!(text.starts_with("Platform:     x86-64-accton-as9736-64d-r0\n"));
        assert!(text.contains("Object ID:    .1.3.6.1.4.1.259.9736.64\n"));
        assert!(text.contains("Transceiver EEPROMs are not on I2C."));
    }

    #[test]
    fn test_ports_lists_eeprom_paths() {
        let platform = PlatformRegistry.create(ES7636BT4).unwrap();
        let text = render_ports(platform.as_ref(), &Config::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 36);
        assert!(lines[0].starts_with("port1 "));
        assert!(lines[0].ends_with("optoe1 /sys/bus/i2c/devices/25-0050/eeprom"));
        assert!(lines[35].ends_with("optoe2 /sys/bus/i2c/devices/64-0050/eeprom"));
    }

    #[test]
    fn test_list_names_every_platform() {
        let text = render_list();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("AS9737-32DB"));
        assert!(text.contains("32x400 + 1x10 + 1x1"));
    }
}
