use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ironbase_core::{CollectionConfig, DatabaseConfig, DatabaseCore, FindOptions};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ironbase")]
#[command(about = "IronBase CLI - Command-line interface for IronBase database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import data from JSON file into database
    Import {
        /// JSON file to import
        file: PathBuf,
        /// Database directory path
        #[arg(long, default_value = "ironbase.db")]
        db: PathBuf,
    },
    /// Export database to JSON file
    Export {
        /// Output JSON file
        file: PathBuf,
        /// Database directory path
        #[arg(long, default_value = "ironbase.db")]
        db: PathBuf,
        /// Export only specific collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// Schema management commands
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Load schema from JSON file or directory (modular)
    Load {
        /// Schema file (.json) or directory containing *.schema.json files
        path: PathBuf,
        /// Database directory path
        #[arg(long, default_value = "ironbase.db")]
        db: PathBuf,
        /// Collection name (required for single file, ignored for directory)
        #[arg(long)]
        collection: Option<String>,
    },
    /// Save schema to JSON file or directory
    Save {
        /// Output file (.json) or directory
        path: PathBuf,
        /// Database directory path
        #[arg(long, default_value = "ironbase.db")]
        db: PathBuf,
        /// Collection name (for single file export)
        #[arg(long)]
        collection: Option<String>,
        /// Export all schemas (for directory export)
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { file, db } => import_data(&file, &db),
        Commands::Export { file, db, collection } => export_data(&file, &db, collection.as_deref()),
        Commands::Schema { action } => match action {
            SchemaAction::Load { path, db, collection } => load_schema(&path, &db, collection.as_deref()),
            SchemaAction::Save { path, db, collection, all } => save_schema(&path, &db, collection.as_deref(), all),
        },
    }
}

fn open_db(db_path: &Path) -> Result<DatabaseCore> {
    let config = DatabaseConfig { path: Some(db_path.display().to_string()), ..DatabaseConfig::default() };
    DatabaseCore::open(config).with_context(|| format!("Failed to open database: {}", db_path.display()))
}

/// Import data from JSON file
/// Format: { "collection_name": [documents...], ... }
fn import_data(file: &Path, db_path: &Path) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read file: {}", file.display()))?;

    let data: Map<String, Value> =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in file: {}", file.display()))?;

    let db = open_db(db_path)?;
    let mut total_docs = 0;

    for (collection_name, documents) in data {
        let docs = documents
            .as_array()
            .with_context(|| format!("Collection '{}' must be an array", collection_name))?;

        db.with_collection(&collection_name, |coll| {
            for doc in docs {
                if !doc.is_object() {
                    return Err(ironbase_core::MongoLiteError::DocumentError(
                        "document must be a JSON object".to_string(),
                    ));
                }
                coll.insert_one(doc.clone())?;
            }
            Ok(())
        })
        .with_context(|| format!("Failed to insert documents into {}", collection_name))?;

        total_docs += docs.len();
        println!("Imported {} documents into '{}'", docs.len(), collection_name);
    }

    println!("Total: {} documents imported to {}", total_docs, db_path.display());
    Ok(())
}

/// Export database to JSON file
fn export_data(file: &Path, db_path: &Path, collection_filter: Option<&str>) -> Result<()> {
    let db = open_db(db_path)?;
    let collections = db.list_collections();

    let mut output: Map<String, Value> = Map::new();
    let mut total_docs = 0;

    for coll_name in collections {
        if let Some(filter) = collection_filter {
            if coll_name != filter {
                continue;
            }
        }

        let docs = db
            .with_collection(&coll_name, |coll| coll.find(&Value::Object(Map::new()), &FindOptions::new()))
            .with_context(|| format!("Failed to query collection: {}", coll_name))?;

        println!("Exporting {} documents from '{}'", docs.documents.len(), coll_name);
        total_docs += docs.documents.len();
        output.insert(coll_name.clone(), Value::Array(docs.documents));
    }

    let json = serde_json::to_string_pretty(&output).with_context(|| "Failed to serialize to JSON")?;
    fs::write(file, json).with_context(|| format!("Failed to write to file: {}", file.display()))?;

    println!("Total: {} documents exported to {}", total_docs, file.display());
    Ok(())
}

/// Load schema from file or directory (modular)
fn load_schema(path: &Path, db_path: &Path, collection: Option<&str>) -> Result<()> {
    let db = open_db(db_path)?;

    if path.is_dir() {
        let entries = fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", path.display()))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry?;
            let file_path = entry.path();

            if let Some(name) = file_path.file_name().and_then(|n| n.to_str()) {
                if let Some(coll_name) = name.strip_suffix(".schema.json") {
                    let schema_content = fs::read_to_string(&file_path)
                        .with_context(|| format!("Failed to read: {}", file_path.display()))?;
                    let schema: Value = serde_json::from_str(&schema_content)
                        .with_context(|| format!("Invalid JSON in: {}", file_path.display()))?;

                    db.create_collection(coll_name, CollectionConfig::default()).ok();
                    db.with_collection(coll_name, |coll| coll.set_schema_from_json(schema))
                        .with_context(|| format!("Failed to set schema for: {}", coll_name))?;

                    println!("Loaded schema for '{}'", coll_name);
                    count += 1;
                }
            }
        }

        println!("Total: {} schemas loaded from {}", count, path.display());
    } else {
        let coll_name = collection
            .ok_or_else(|| anyhow::anyhow!("--collection required when loading single schema file"))?;

        let schema_content =
            fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))?;
        let schema: Value =
            serde_json::from_str(&schema_content).with_context(|| format!("Invalid JSON in: {}", path.display()))?;

        db.create_collection(coll_name, CollectionConfig::default()).ok();
        db.with_collection(coll_name, |coll| coll.set_schema_from_json(schema))
            .with_context(|| format!("Failed to set schema for: {}", coll_name))?;

        println!("Loaded schema for '{}' from {}", coll_name, path.display());
    }

    Ok(())
}

/// Save schema to file or directory
fn save_schema(path: &Path, db_path: &Path, collection: Option<&str>, all: bool) -> Result<()> {
    let db = open_db(db_path)?;

    if all || path.is_dir() || (collection.is_none() && path.extension().is_none_or(|e| e != "json")) {
        let dir_path = if path.exists() && path.is_dir() {
            path.to_path_buf()
        } else {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {}", path.display()))?;
            path.to_path_buf()
        };

        let collections = db.list_collections();
        let mut count = 0;
        for coll_name in collections {
            let schema = db
                .with_collection(&coll_name, |coll| Ok(coll.schema_json()))
                .with_context(|| format!("Failed to read collection: {}", coll_name))?;

            if let Some(schema) = schema {
                let file_path = dir_path.join(format!("{}.schema.json", coll_name));
                let json = serde_json::to_string_pretty(&schema).with_context(|| "Failed to serialize schema")?;
                fs::write(&file_path, json).with_context(|| format!("Failed to write: {}", file_path.display()))?;

                println!("Saved schema for '{}' to {}", coll_name, file_path.display());
                count += 1;
            }
        }

        println!("Total: {} schemas saved to {}", count, dir_path.display());
    } else {
        let coll_name =
            collection.ok_or_else(|| anyhow::anyhow!("--collection required when saving single schema file"))?;

        let schema = db
            .with_collection(coll_name, |coll| Ok(coll.schema_json()))
            .with_context(|| format!("Failed to read collection: {}", coll_name))?
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' has no schema", coll_name))?;

        let json = serde_json::to_string_pretty(&schema).with_context(|| "Failed to serialize schema")?;
        fs::write(path, json).with_context(|| format!("Failed to write: {}", path.display()))?;

        println!("Saved schema for '{}' to {}", coll_name, path.display());
    }

    Ok(())
}
