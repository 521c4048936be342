use anyhow::{bail, Context, Result};
use kvrel::sql::ast::{SelectStatement, Statement, TableRef};
use kvrel::{EngineConfig, ExecutionEngine};
use std::env;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: kvrel-inspect [--data-dir DIR] [TABLE...]";

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = EngineConfig::new();
    let mut tables = Vec::new();

    // Simple argument parsing
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" | "-d" => {
                let dir = args.next().context("--data-dir needs a value")?;
                config = config.data_dir(dir);
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'\n{}", flag, USAGE),
            table => tables.push(table.to_string()),
        }
    }

    if !config.catalog_path().exists() {
        bail!("no database at {}", config.data_dir.display());
    }
    let mut engine = ExecutionEngine::open(config).context("failed to open database")?;

    if tables.is_empty() {
        let result = engine.execute(Statement::ShowTables)?;
        print!("{}", result.render());
        return Ok(());
    }

    for table in tables {
        let desc = engine
            .execute(Statement::Describe(table.clone()))
            .with_context(|| format!("cannot describe '{}'", table))?;
        println!("{}", table);
        print!("{}", desc.render());

        let rows = engine.execute(Statement::Select(SelectStatement {
            columns: Vec::new(),
            from: vec![TableRef::new(&table)],
            where_clause: None,
        }))?;
        print!("{}", rows.render());
        println!("{} row(s)", rows.rows.len());
    }
    Ok(())
}
