//! CLI argument definitions and subcommand routing.

pub mod config;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use supabase::Client;

use self::config::{KEYS, Profile, mask, profile_path};

/// Command-line client for a Supabase project.
///
/// Connection settings come from flags, then environment variables, then the
/// saved profile (see `supabase config`).
#[derive(Parser, Debug)]
#[command(name = "supabase", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub conn: ConnArgs,

    /// Log filter for the library (e.g. "debug", "supabase_ffi=trace").
    #[arg(long, global = true, env = "SUPABASE_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Project connection settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnArgs {
    /// Project URL.
    #[arg(long, global = true, env = "SUPABASE_URL")]
    pub url: Option<String>,

    /// Anon or publishable API key.
    #[arg(long, global = true, env = "SUPABASE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Service-role key for admin calls.
    #[arg(long, global = true, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub service_role_key: Option<String>,

    /// Postgres schema.
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Sign in before running the command.
#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Email to sign in with first.
    #[arg(long, env = "SUPABASE_EMAIL", requires = "password")]
    pub email: Option<String>,

    /// Password for `--email`.
    #[arg(long, env = "SUPABASE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// One-shot operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password and print the session.
    SignIn {
        email: String,
        password: String,
    },
    /// Register a new user.
    SignUp {
        email: String,
        password: String,
    },
    /// Read rows from a table.
    Select {
        table: String,
        /// Column list, e.g. "id,title".
        #[arg(short, long, default_value = "*")]
        columns: String,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Insert a JSON object or array of objects.
    Insert {
        table: String,
        /// Row(s) as JSON.
        json: String,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// List storage buckets.
    #[command(alias = "ls")]
    Buckets,
    /// Invoke an edge function.
    Invoke {
        name: String,
        /// Request body as JSON.
        json: Option<String>,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Print library version.
    Version,
    /// Show or change the saved profile.
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the saved profile (secrets masked).
    Show,
    /// Set a value. An empty value clears it.
    Set { key: String, value: String },
    /// Print the profile file location.
    Path,
}

/// Fill unset flags from the profile.
pub fn resolve(conn: &ConnArgs, profile: &Profile) -> ConnArgs {
    ConnArgs {
        url: conn.url.clone().or_else(|| profile.url.clone()),
        key: conn.key.clone().or_else(|| profile.key.clone()),
        service_role_key: conn
            .service_role_key
            .clone()
            .or_else(|| profile.service_role_key.clone()),
        schema: conn.schema.clone().or_else(|| profile.schema.clone()),
        timeout: conn.timeout.or(profile.timeout_secs),
    }
}

/// Build a client from resolved settings.
pub fn connect(conn: &ConnArgs) -> supabase::Result<Client> {
    let url = conn.url.as_deref().ok_or_else(|| {
        supabase::Error::InvalidArgument("no project url (use --url, SUPABASE_URL or `config set url`)".into())
    })?;
    let key = conn.key.as_deref().ok_or_else(|| {
        supabase::Error::InvalidArgument("no api key (use --key, SUPABASE_KEY or `config set key`)".into())
    })?;
    let mut builder = Client::builder(url, key);
    if let Some(k) = &conn.service_role_key {
        builder = builder.service_role_key(k.as_str());
    }
    if let Some(s) = &conn.schema {
        builder = builder.schema(s.as_str());
    }
    if let Some(t) = conn.timeout {
        builder = builder.timeout(Duration::from_secs(t));
    }
    builder.build()
}

fn login(client: &Client, login: &LoginArgs) -> supabase::Result<()> {
    if let (Some(email), Some(password)) = (&login.email, &login.password) {
        client.sign_in(email, password)?;
    }
    Ok(())
}

fn parse_json(s: &str) -> supabase::Result<Value> {
    Ok(serde_json::from_str(s)?)
}

/// Execute a command and return what to print.
pub fn run(cli: Cli) -> supabase::Result<Value> {
    if let Some(level) = &cli.log_level {
        supabase::init_logger(Some(level))?;
    }

    let client = || -> supabase::Result<Client> { connect(&resolve(&cli.conn, &Profile::load()?)) };
    match cli.command {
        Command::Version => Ok(Value::String(supabase::version().to_owned())),
        Command::Config { action } => run_config(action.unwrap_or(ConfigAction::Show)),
        Command::SignIn { email, password } => client()?.sign_in(&email, &password),
        Command::SignUp { email, password } => client()?.sign_up(&email, &password),
        Command::Select {
            table,
            columns,
            login: l,
        } => {
            let client = client()?;
            login(&client, &l)?;
            client.select(&table, &columns)
        }
        Command::Insert {
            table,
            json,
            login: l,
        } => {
            let rows = parse_json(&json)?;
            let client = client()?;
            login(&client, &l)?;
            client.insert(&table, &rows)
        }
        Command::Buckets => Ok(serde_json::to_value(client()?.list_buckets()?)?),
        Command::Invoke {
            name,
            json,
            login: l,
        } => {
            let body = json.as_deref().map(parse_json).transpose()?;
            let client = client()?;
            login(&client, &l)?;
            client.invoke(&name, body.as_ref())
        }
    }
}

fn run_config(action: ConfigAction) -> supabase::Result<Value> {
    match action {
        ConfigAction::Path => Ok(Value::String(profile_path().display().to_string())),
        ConfigAction::Set { key, value } => {
            let mut profile = Profile::load()?;
            profile.set(&key, &value)?;
            profile.save()?;
            Ok(Value::Null)
        }
        ConfigAction::Show => {
            let profile = Profile::load()?;
            let mut out = serde_json::Map::new();
            for key in KEYS {
                let value = profile.get(key).map(|v| {
                    if key.ends_with("key") { mask(&v) } else { v }
                });
                out.insert(key.to_owned(), value.map_or(Value::Null, Value::String));
            }
            Ok(Value::Object(out))
        }
    }
}
