//! Nodeweave CLI: inspect schema files and run GraphQL documents.
//!
//! Usage:
//!   nodeweave sdl --schema schema.yaml
//!   nodeweave classes --schema schema.yaml
//!   nodeweave query --schema schema.yaml --identity ID --org ID [DOCUMENT|-] [--db path]

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Variables};
use clap::{Parser, Subcommand};
use nodeweave::{
    graphql, Cardinality, GraphEngine, MemoryStore, NodeId, OpenStore, SchemaFile, SqliteStore,
    StorageAdapter, Viewer,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "nodeweave",
    version,
    about = "Schema-driven object graph with a GraphQL surface"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the GraphQL SDL derived from a schema file
    Sdl {
        /// Path to the YAML schema file
        #[arg(long)]
        schema: PathBuf,
    },
    /// List declared classes with their fields and relationships
    Classes {
        /// Path to the YAML schema file
        #[arg(long)]
        schema: PathBuf,
    },
    /// Execute a GraphQL document against a SQLite database
    Query {
        /// Path to the YAML schema file
        #[arg(long)]
        schema: PathBuf,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Identity the request runs as
        #[arg(long)]
        identity: String,
        /// Organization scope of the identity
        #[arg(long)]
        org: String,
        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
        /// GraphQL document, or `-` to read stdin
        #[arg(default_value = "-")]
        document: String,
    },
}

/// Get the default database path (~/.local/share/nodeweave/nodeweave.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let dir = data_dir.join("nodeweave");
    std::fs::create_dir_all(&dir).ok();
    dir.join("nodeweave.db")
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn load_schema(path: &Path) -> Result<SchemaFile, String> {
    SchemaFile::load(path).map_err(|e| format!("Failed to load {}: {}", path.display(), e))
}

fn open_engine(file: &SchemaFile, store: Arc<dyn StorageAdapter>) -> Result<GraphEngine, String> {
    let registry = file.build_registry().map_err(|e| e.to_string())?;
    Ok(GraphEngine::new(store, registry).with_config(file.engine.clone()))
}

fn cmd_sdl(schema: &Path) -> i32 {
    let result = load_schema(schema)
        .and_then(|file| open_engine(&file, Arc::new(MemoryStore::new())))
        .and_then(|engine| graphql::sdl(engine).map_err(|e| e.to_string()));
    match result {
        Ok(sdl) => {
            println!("{}", sdl);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_classes(schema: &Path) -> i32 {
    let registry = load_schema(schema)
        .and_then(|file| file.build_registry().map_err(|e| e.to_string()));
    let registry = match registry {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if registry.is_empty() {
        println!("No classes declared");
        return 0;
    }
    for class in registry.classes() {
        println!("{}", class.name());
        for (name, field_type) in class.fields() {
            println!("  {}: {}", name, field_type.as_str());
        }
        for rel in class.relationships() {
            let arity = match rel.cardinality {
                Cardinality::One => "one",
                Cardinality::Many => "many",
            };
            println!("  {} -> {} ({})", rel.role, rel.target, arity);
        }
    }
    0
}

fn read_document(document: String) -> Result<String, String> {
    if document != "-" {
        return Ok(document);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    Ok(buf)
}

fn prepare_query(
    schema: &Path,
    db: Option<PathBuf>,
    variables: Option<String>,
    document: String,
) -> Result<(Schema, Request), String> {
    let file = load_schema(schema)?;
    let db_path = db.unwrap_or_else(default_db_path);
    let store =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    let engine = open_engine(&file, Arc::new(store))?;
    let api = graphql::build_schema(engine).map_err(|e| e.to_string())?;

    let mut request = Request::new(read_document(document)?);
    if let Some(vars) = variables {
        let vars: serde_json::Value =
            serde_json::from_str(&vars).map_err(|e| format!("Invalid variables: {}", e))?;
        request = request.variables(Variables::from_json(vars));
    }
    Ok((api, request))
}

async fn cmd_query(
    schema: &Path,
    db: Option<PathBuf>,
    viewer: Viewer,
    variables: Option<String>,
    document: String,
) -> i32 {
    let (api, request) = match prepare_query(schema, db, variables, document) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    tracing::info!(viewer = %viewer, "executing document");
    let response = graphql::execute(&api, viewer, request).await;
    match serde_json::to_string_pretty(&response) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    if response.errors.is_empty() {
        0
    } else {
        1
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Sdl { schema } => cmd_sdl(&schema),
        Commands::Classes { schema } => cmd_classes(&schema),
        Commands::Query {
            schema,
            db,
            identity,
            org,
            variables,
            document,
        } => {
            let viewer = Viewer::new(NodeId::from(identity), NodeId::from(org));
            cmd_query(&schema, db, viewer, variables, document).await
        }
    };
    std::process::exit(code);
}
