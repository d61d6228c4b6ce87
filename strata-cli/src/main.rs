use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::time::Instant;
use strata::{CacheProvider, RemoteCache, RemoteConfig, SetOptions};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "strata-cli")]
#[command(about = "Strata CLI - inspect and administer a remote cache namespace", long_about = None)]
struct Args {
    /// Base URL of the backing KV service
    #[arg(short = 'u', long, default_value = "http://127.0.0.1:15500")]
    url: String,

    /// Cache namespace to operate on
    #[arg(short = 'n', long, default_value = "strata")]
    namespace: String,

    /// Optional bearer token
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Command to execute (if not in interactive mode)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

struct Admin {
    cache: RemoteCache<serde_json::Value>,
    namespace: String,
}

impl Admin {
    fn new(args: &Args) -> Result<Self> {
        let mut config = RemoteConfig::new(args.url.clone()).with_namespace(args.namespace.clone());
        if let Some(ref token) = args.token {
            config = config.with_auth_token(token.clone());
        }

        Ok(Self {
            cache: RemoteCache::new(config)?,
            namespace: args.namespace.clone(),
        })
    }

    async fn execute_command(&self, command: &str, args: &[String]) -> Result<String> {
        let start = Instant::now();

        let response = match command.to_uppercase().as_str() {
            "GET" => self.cmd_get(args).await?,
            "SET" => self.cmd_set(args).await?,
            "DEL" | "DELETE" => self.cmd_del(args).await?,
            "EXISTS" => self.cmd_exists(args).await?,
            "KEYS" => self.cmd_keys().await?,
            "TAG" => self.cmd_tag(args).await?,
            "INVALIDATE" => self.cmd_invalidate(args).await?,
            "CLEAR" => self.cmd_clear().await?,
            "HELP" => self.help_text()?,
            _ => return Err(anyhow::anyhow!("Unknown command: {}", command)),
        };

        let elapsed = start.elapsed();
        Ok(format!(
            "{}\n{}",
            response,
            format!("({:.2?})", elapsed).dimmed()
        ))
    }

    async fn cmd_get(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: GET key"));
        }

        match self.cache.get(&args[0]).await {
            Some(value) => Ok(value.to_string()),
            None => Ok("(nil)".dimmed().to_string()),
        }
    }

    async fn cmd_set(&self, args: &[String]) -> Result<String> {
        if args.len() < 2 {
            return Err(anyhow::anyhow!("Usage: SET key value [ttl_ms] [tag,tag...]"));
        }

        // Treat the value as JSON where it parses, as a plain string otherwise
        let value = serde_json::from_str(&args[1])
            .unwrap_or_else(|_| serde_json::Value::String(args[1].clone()));

        let mut options = SetOptions::new();
        if let Some(ttl_ms) = args.get(2).and_then(|s| s.parse::<u64>().ok()) {
            options = options.with_ttl_ms(ttl_ms);
        }
        if let Some(tags) = args.get(3) {
            options = options.with_tags(tags.split(','));
        }

        self.cache.set(&args[0], value, &options).await?;
        Ok("OK".green().to_string())
    }

    async fn cmd_del(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: DEL key"));
        }

        let deleted = self.cache.delete(&args[0]).await?;
        Ok(format!("(integer) {}", if deleted { 1 } else { 0 }))
    }

    async fn cmd_exists(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: EXISTS key"));
        }

        let exists = self.cache.has(&args[0]).await;
        Ok(format!("(integer) {}", if exists { 1 } else { 0 }))
    }

    async fn cmd_keys(&self) -> Result<String> {
        let keys = self.cache.keys().await?;
        if keys.is_empty() {
            return Ok("(empty)".dimmed().to_string());
        }

        Ok(keys
            .iter()
            .enumerate()
            .map(|(i, k)| format!("{}) \"{}\"", i + 1, k))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn cmd_tag(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: TAG tag"));
        }

        let members = self.cache.tag_members(&args[0]).await?;
        if members.is_empty() {
            return Ok("(empty)".dimmed().to_string());
        }

        Ok(members
            .iter()
            .enumerate()
            .map(|(i, k)| format!("{}) \"{}\"", i + 1, k))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn cmd_invalidate(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: INVALIDATE tag"));
        }

        let members = self.cache.tag_members(&args[0]).await?;
        let mut dropped = 0;
        for key in &members {
            if self.cache.delete(key).await? {
                dropped += 1;
            }
        }

        Ok(format!("(integer) {}", dropped))
    }

    async fn cmd_clear(&self) -> Result<String> {
        self.cache.clear().await?;
        Ok("OK".green().to_string())
    }

    fn help_text(&self) -> Result<String> {
        Ok(format!(
            r#"{}

{}
  GET key                    Get the cached value for key
  SET key value [ttl] [tags] Set key with optional TTL (ms) and comma-separated tags
  DEL key                    Delete key and prune its tag sets
  EXISTS key                 Check whether key would hit

{}
  KEYS                       List keys stored under namespace "{}"
  TAG tag                    List keys recorded under a tag
  INVALIDATE tag             Delete every key recorded under a tag

{}
  CLEAR                      Remove every entry in the namespace
  HELP                       Show this help message
  QUIT                       Exit the CLI
"#,
            "Strata CLI - Available Commands".bold().cyan(),
            "Entry Commands:".bold(),
            "Inspection Commands:".bold(),
            self.namespace,
            "Namespace Commands:".bold(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info level by default so user-facing output is visible
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let args = Args::parse();
    let admin = Admin::new(&args)?;

    if !args.command.is_empty() {
        // Command mode: execute single command and exit
        let cmd = &args.command[0];
        let cmd_args: Vec<String> = args.command[1..].to_vec();

        match admin.execute_command(cmd, &cmd_args).await {
            Ok(output) => {
                info!("{}", output);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
    } else {
        run_interactive(admin, &args.url, &args.namespace).await
    }
}

async fn run_interactive(admin: Admin, url: &str, namespace: &str) -> Result<()> {
    info!(
        "{}",
        format!("Strata CLI v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    info!("Connected to {} (namespace: {})", url, namespace);
    info!("Type {} for available commands\n", "HELP".bold());

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("{}> ", format!("strata {}", namespace).green());
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                rl.add_history_entry(&line)?;

                let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
                if parts.is_empty() {
                    continue;
                }

                let cmd = &parts[0];
                let args = &parts[1..];

                if cmd.to_uppercase() == "QUIT" || cmd.to_uppercase() == "EXIT" {
                    info!("Goodbye!");
                    break;
                }

                match admin.execute_command(cmd, args).await {
                    Ok(output) => info!("{}", output),
                    Err(e) => {
                        error!(error = %e, "{}", format!("Error: {}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("Goodbye!");
                break;
            }
            Err(err) => {
                error!(error = ?err, "Readline error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
