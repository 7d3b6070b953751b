use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use subnet_inventory::config::ResolverConfig;
use subnet_inventory::output::{
    print_faults, print_summary, render_all, render_banner, render_hosts, render_subnet,
    write_json, Export, ReportOptions,
};
use subnet_inventory::{reconcile, select_subnets, Settings};

/// Report used and free IPv4 addresses per site subnet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings YAML (default: inventory.yml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the node/ and site/ documents [env: INVENTORY_DATA_DIR]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Resolve hosts through this directory of host -> site symlinks [env: INVENTORY_LINK_DIR]
    #[arg(long)]
    links: Option<PathBuf>,

    /// File name to skip, may be repeated
    #[arg(long)]
    skip: Vec<String>,

    /// Subnet to report, a.b.c.d or a.b.c.d/len
    #[arg(short, long)]
    subnet: Option<String>,

    /// Only the first free address
    #[arg(short, long)]
    first: bool,

    /// Also list used addresses
    #[arg(long)]
    used: bool,

    /// Also count used addresses
    #[arg(long)]
    count: bool,

    /// List every host's addresses instead of subnets
    #[arg(long)]
    hosts: bool,

    /// Write the subnet summary as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    if let Err(e) = log4rs::init_file("log4rs.yml", Default::default()) {
        eprintln!("log4rs.yml not loaded, logging disabled: {e}");
    }
    dotenv::dotenv().ok();
    let args = Args::parse();
    log::info!("#Start main() {args:?}");

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_env();
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(link_dir) = args.links {
        settings.resolver = ResolverConfig::Links { link_dir };
    }
    settings.skip_files.extend(args.skip);

    let (inventory, table) = reconcile(&settings)?;

    print!(
        "{}",
        render_banner(Local::now(), inventory.hosts.len(), inventory.sites.len())
    );
    print_faults(&inventory.faults);

    let opts = ReportOptions {
        first_only: args.first,
        show_used: args.used,
        count_used: args.count,
    };
    if args.hosts {
        print!("{}", render_hosts(&inventory.hosts));
    } else if let Some(query) = &args.subnet {
        let found = select_subnets(&table, query)?;
        if found.is_empty() {
            return Err(format!("no subnet in the inventory matches {query}").into());
        }
        for (mask, network) in found {
            print!("{}", render_subnet(&table, mask, network, &opts)?);
        }
    } else {
        print!("{}", render_all(&table, &opts));
        print_summary(&table);
    }

    if let Some(path) = &args.json {
        write_json(&Export::new(&table, &inventory.faults), path)?;
    }
    Ok(())
}
