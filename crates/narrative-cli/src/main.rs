// crates/narrative-cli/src/main.rs
// ============================================================================
// Module: Narrative Agent CLI Entry Point
// Description: Command dispatcher for ref, app spec, and transform helpers.
// Purpose: Expose the KBase client helpers for scripting and diagnostics.
// Dependencies: clap, narrative-app, narrative-config, narrative-kbase, serde, thiserror.
// ============================================================================

//! ## Overview
//! The `narrative-agent` binary wraps the app helpers and KBase clients.
//! Every command writes a single JSON document to stdout on success and a
//! one-line message to stderr with a failing exit code otherwise. Commands
//! that only inspect local inputs (`ref check`, `transform` without
//! resolution, `generate`, `app params --spec`) never contact a service.
//! Security posture: spec and parameter files are untrusted and read with
//! hard size limits; tokens come from the environment and are never echoed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use narrative_app::AppSpec;
use narrative_app::build_service_inputs;
use narrative_app::generate_input;
use narrative_app::get_processed_app_spec_params;
use narrative_app::get_ws_object_refs;
use narrative_app::is_valid_ref;
use narrative_app::is_valid_upa;
use narrative_app::resolve_single_ref;
use narrative_app::transform_param_value;
use narrative_config::NarrativeConfig;
use narrative_kbase::AppTag;
use narrative_kbase::KBaseClients;
use narrative_kbase::ServiceAuditSink;
use narrative_kbase::audit_sink_from_config;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an app spec file.
const MAX_SPEC_BYTES: usize = 4 * 1024 * 1024;
/// Maximum size of a parameter file.
const MAX_PARAMS_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "narrative-agent", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (overrides `NARRATIVE_AGENT_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Object reference utilities.
    Ref {
        /// Selected ref subcommand.
        #[command(subcommand)]
        command: RefCommand,
    },
    /// App spec utilities.
    App {
        /// Selected app subcommand.
        #[command(subcommand)]
        command: AppCommand,
    },
    /// Transform a parameter value the way service input mapping does.
    Transform(TransformCommand),
    /// Generate a random input value.
    Generate(GenerateCommand),
    /// Auth service utilities.
    Auth {
        /// Selected auth subcommand.
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Ref subcommands.
#[derive(Subcommand, Debug)]
enum RefCommand {
    /// Report whether values are UPAs or refs.
    Check(RefCheckCommand),
    /// Resolve refs to UPAs through the Workspace.
    Resolve(RefResolveCommand),
}

/// Arguments for `ref check`.
#[derive(Args, Debug)]
struct RefCheckCommand {
    /// Values to check.
    #[arg(required = true, value_name = "VALUE")]
    values: Vec<String>,
}

/// Arguments for `ref resolve`.
#[derive(Args, Debug)]
struct RefResolveCommand {
    /// Workspace id used to qualify bare object names.
    #[arg(long, value_name = "ID")]
    ws_id: u64,
    /// Refs to resolve.
    #[arg(required = true, value_name = "REF")]
    refs: Vec<String>,
}

/// App subcommands.
#[derive(Subcommand, Debug)]
enum AppCommand {
    /// Print the processed parameter descriptions of an app.
    Params(AppParamsCommand),
    /// List the input object refs in a parameter set.
    Refs(AppRefsCommand),
    /// Build service call arguments from a parameter set.
    Inputs(AppInputsCommand),
}

/// Where an app spec comes from.
#[derive(Args, Debug, Clone)]
struct AppSourceArgs {
    /// Local app spec JSON file.
    #[arg(long, value_name = "PATH", conflicts_with = "app_id", required_unless_present = "app_id")]
    spec: Option<PathBuf>,
    /// App id to fetch from the Narrative Method Store (`Module/method`).
    #[arg(long, value_name = "ID")]
    app_id: Option<String>,
    /// Release tag used with `--app-id`.
    #[arg(long, value_name = "TAG", default_value = "release")]
    tag: AppTag,
}

/// Arguments for `app params`.
#[derive(Args, Debug)]
struct AppParamsCommand {
    /// App spec source.
    #[command(flatten)]
    source: AppSourceArgs,
}

/// Arguments for `app refs`.
#[derive(Args, Debug)]
struct AppRefsCommand {
    /// App spec source.
    #[command(flatten)]
    source: AppSourceArgs,
    /// Parameter set JSON file.
    #[arg(long, value_name = "PATH")]
    params: PathBuf,
}

/// Arguments for `app inputs`.
#[derive(Args, Debug)]
struct AppInputsCommand {
    /// App spec source.
    #[command(flatten)]
    source: AppSourceArgs,
    /// Parameter set JSON file.
    #[arg(long, value_name = "PATH")]
    params: PathBuf,
    /// Workspace id the app runs in.
    #[arg(long, value_name = "ID")]
    ws_id: u64,
    /// User name for the `user_id` system variable (defaults to the token owner).
    #[arg(long, value_name = "USER")]
    user: Option<String>,
}

/// Arguments for `transform`.
#[derive(Args, Debug)]
struct TransformCommand {
    /// Transform type (`string`, `int`, `list<resolved-ref>`, ...).
    #[arg(long = "type", value_name = "TYPE")]
    transform_type: Option<String>,
    /// Value as JSON; text that is not valid JSON is taken as a string.
    #[arg(long, value_name = "JSON", allow_hyphen_values = true)]
    value: String,
    /// Workspace id used to qualify bare object names.
    #[arg(long, value_name = "ID", default_value_t = 0)]
    ws_id: u64,
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Number of random symbols.
    #[arg(long, value_name = "N")]
    symbols: Option<u64>,
    /// Text placed before the random symbols.
    #[arg(long, value_name = "TEXT")]
    prefix: Option<String>,
    /// Text placed after the random symbols.
    #[arg(long, value_name = "TEXT")]
    suffix: Option<String>,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Describe the configured token.
    Whoami,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// One `ref check` result.
#[derive(Debug, Serialize)]
struct RefCheckReport<'a> {
    /// Checked value.
    value: &'a str,
    /// True when the value is a UPA.
    is_upa: bool,
    /// True when the value is a ref.
    is_ref: bool,
}

/// One `ref resolve` result.
#[derive(Debug, Serialize)]
struct RefResolveReport<'a> {
    /// Input ref.
    #[serde(rename = "ref")]
    reference: &'a str,
    /// Resolved UPA.
    upa: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Ref {
            command,
        } => command_ref(command, config_path),
        Commands::App {
            command,
        } => command_app(command, config_path),
        Commands::Transform(command) => command_transform(&command, config_path),
        Commands::Generate(command) => command_generate(command),
        Commands::Auth {
            command: AuthCommand::Whoami,
        } => command_auth_whoami(config_path),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(config_path),
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Loaded configuration plus service clients.
struct Session {
    /// Service clients.
    clients: KBaseClients,
    /// True when a token was found in the environment.
    has_token: bool,
}

/// Loads configuration, reporting failures as CLI errors.
fn load_config(config_path: Option<&Path>) -> CliResult<NarrativeConfig> {
    NarrativeConfig::load(config_path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Builds service clients from configuration and the environment token.
fn open_session(config_path: Option<&Path>) -> CliResult<Session> {
    let config = load_config(config_path)?;
    let token = config.auth.token_from_env();
    let has_token = token.is_some();
    let audit: Arc<dyn ServiceAuditSink> = audit_sink_from_config(&config.audit)
        .map_err(|err| CliError::new(format!("failed to open audit log: {err}")))?;
    let clients = KBaseClients::from_config(&config, token, &audit)
        .map_err(|err| CliError::new(format!("failed to build service clients: {err}")))?;
    Ok(Session {
        clients,
        has_token,
    })
}

// ============================================================================
// SECTION: Ref Commands
// ============================================================================

/// Dispatches ref subcommands.
fn command_ref(command: RefCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        RefCommand::Check(command) => command_ref_check(&command),
        RefCommand::Resolve(command) => command_ref_resolve(&command, config_path),
    }
}

/// Executes `ref check`.
fn command_ref_check(command: &RefCheckCommand) -> CliResult<ExitCode> {
    let reports: Vec<RefCheckReport<'_>> = command
        .values
        .iter()
        .map(|value| RefCheckReport {
            value,
            is_upa: is_valid_upa(value),
            is_ref: is_valid_ref(value),
        })
        .collect();
    write_json(&reports)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `ref resolve`.
fn command_ref_resolve(
    command: &RefResolveCommand,
    config_path: Option<&Path>,
) -> CliResult<ExitCode> {
    let session = open_session(config_path)?;
    let reports = command
        .refs
        .iter()
        .map(|reference| {
            resolve_single_ref(reference, command.ws_id, &session.clients.workspace)
                .map(|upa| RefResolveReport {
                    reference,
                    upa,
                })
                .map_err(|err| CliError::new(format!("failed to resolve {reference}: {err}")))
        })
        .collect::<CliResult<Vec<_>>>()?;
    write_json(&reports)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: App Commands
// ============================================================================

/// Dispatches app subcommands.
fn command_app(command: AppCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        AppCommand::Params(command) => {
            let spec = load_app_spec(&command.source, config_path, None)?;
            write_json(&get_processed_app_spec_params(&spec))?;
        }
        AppCommand::Refs(command) => {
            let spec = load_app_spec(&command.source, config_path, None)?;
            let params = read_params(&command.params)?;
            write_json(&get_ws_object_refs(&spec, &params))?;
        }
        AppCommand::Inputs(command) => command_app_inputs(command, config_path)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `app inputs`.
fn command_app_inputs(command: AppInputsCommand, config_path: Option<&Path>) -> CliResult<()> {
    let session = open_session(config_path)?;
    let spec = load_app_spec(&command.source, config_path, Some(&session))?;
    let params = read_params(&command.params)?;
    let user = match command.user {
        Some(user) => Some(user),
        None if session.has_token => Some(
            session
                .clients
                .auth
                .current_token_info()
                .map_err(|err| CliError::new(format!("failed to look up token owner: {err}")))?
                .user,
        ),
        None => None,
    };
    let args = build_service_inputs(
        &spec,
        &params,
        command.ws_id,
        &session.clients.workspace,
        user.as_deref(),
    )
    .map_err(|err| CliError::new(format!("failed to build service inputs: {err}")))?;
    write_json(&args)
}

/// Loads an app spec from a file or the Narrative Method Store.
fn load_app_spec(
    source: &AppSourceArgs,
    config_path: Option<&Path>,
    session: Option<&Session>,
) -> CliResult<AppSpec> {
    let value = match (&source.spec, &source.app_id) {
        (Some(path), _) => read_json_file(path, MAX_SPEC_BYTES)?,
        (None, Some(app_id)) => {
            let opened;
            let session = match session {
                Some(session) => session,
                None => {
                    opened = open_session(config_path)?;
                    &opened
                }
            };
            session
                .clients
                .method_store
                .get_app_spec(app_id, source.tag)
                .map_err(|err| CliError::new(format!("failed to fetch app spec {app_id}: {err}")))?
        }
        (None, None) => {
            return Err(CliError::new("either --spec or --app-id is required".to_string()));
        }
    };
    serde_json::from_value(value)
        .map_err(|err| CliError::new(format!("invalid app spec: {err}")))
}

/// Reads a parameter set file, which must hold a JSON object.
fn read_params(path: &Path) -> CliResult<Map<String, Value>> {
    match read_json_file(path, MAX_PARAMS_BYTES)? {
        Value::Object(params) => Ok(params),
        _ => Err(CliError::new(format!(
            "{} must contain a JSON object of parameter values",
            path.display()
        ))),
    }
}

// ============================================================================
// SECTION: Value Commands
// ============================================================================

/// Executes `transform`.
fn command_transform(command: &TransformCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let value = parse_value_arg(&command.value);
    let session = open_session(config_path)?;
    let transformed = transform_param_value(
        command.transform_type.as_deref(),
        &value,
        None,
        command.ws_id,
        &session.clients.workspace,
    )
    .map_err(|err| CliError::new(format!("transform failed: {err}")))?;
    write_json(&transformed)?;
    Ok(ExitCode::SUCCESS)
}

/// Parses a value argument as JSON, falling back to a plain string.
fn parse_value_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Executes `generate`.
fn command_generate(command: GenerateCommand) -> CliResult<ExitCode> {
    let generator = generator_options(command);
    let value = generate_input(Some(&generator))
        .map_err(|err| CliError::new(format!("generate failed: {err}")))?;
    write_json(&serde_json::json!({ "value": value }))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds generator options from CLI flags.
fn generator_options(command: GenerateCommand) -> Map<String, Value> {
    let mut generator = Map::new();
    if let Some(symbols) = command.symbols {
        generator.insert("symbols".to_string(), Value::from(symbols));
    }
    if let Some(prefix) = command.prefix {
        generator.insert("prefix".to_string(), Value::String(prefix));
    }
    if let Some(suffix) = command.suffix {
        generator.insert("suffix".to_string(), Value::String(suffix));
    }
    generator
}

// ============================================================================
// SECTION: Auth and Config Commands
// ============================================================================

/// Executes `auth whoami`.
fn command_auth_whoami(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let session = open_session(config_path)?;
    if !session.has_token {
        return Err(CliError::new("no auth token found in the environment".to_string()));
    }
    let info = session
        .clients
        .auth
        .current_token_info()
        .map_err(|err| CliError::new(format!("token lookup failed: {err}")))?;
    write_json(&info)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let _config = load_config(config_path)?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a bounded JSON file.
fn read_json_file(path: &Path, max_bytes: usize) -> CliResult<Value> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} exceeds size limit ({size} > {limit} bytes)",
            path.display()
        )),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("{} is not valid JSON: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as pretty JSON.
fn write_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
