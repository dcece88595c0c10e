// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use records_vault::config::{KdfProfile, LogFormat, VaultConfig, PASSPHRASE_ENV};
use records_vault::error::{VaultError, VaultResult};
use records_vault::records::{authenticate, enroll_principal, GradeBook, NewPrincipal, RecordsError};
use records_vault::session::EnrichmentStatus;
use records_vault::storage::{RecordDatabase, RecordRef, StorageAdapter, StorageError, VaultPaths};
use records_vault::worker::offload;
use records_vault::{logging, CipherCodec, KeyManager, Passphrase, SessionKeyContext};

#[derive(Parser)]
#[command(name = "records-vault")]
#[command(about = "Field-level RSA encryption for records management")]
struct Cli {
    /// Data directory (overrides DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Private-key envelope KDF: scrypt or pbkdf2 (overrides KEY_KDF)
    #[arg(long)]
    kdf: Option<String>,

    /// scrypt log_n or PBKDF2 iterations (overrides KEY_KDF_COST)
    #[arg(long)]
    kdf_cost: Option<String>,

    /// Environment variable holding the passphrase
    #[arg(long, default_value = PASSPHRASE_ENV)]
    passphrase_env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a keypair for a principal and print its public key
    Keygen {
        principal_id: String,
        /// Replace an existing key (values encrypted under it become unreadable)
        #[arg(long)]
        force: bool,
    },
    /// Encrypt a value under a principal's public key
    Encrypt {
        plaintext: String,
        /// Principal whose stored public key to use
        #[arg(long, conflicts_with = "public_key", required_unless_present = "public_key")]
        principal: Option<String>,
        /// PEM file holding the public key
        #[arg(long)]
        public_key: Option<PathBuf>,
        /// Write raw ciphertext here instead of printing base64
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decrypt a value with a principal's private key
    Decrypt {
        principal_id: String,
        /// Base64 ciphertext
        #[arg(required_unless_present = "input")]
        ciphertext: Option<String>,
        /// Read raw ciphertext from this file
        #[arg(long = "in", conflicts_with = "ciphertext")]
        input: Option<PathBuf>,
    },
    /// Print the SHA-1 credential digest of the passphrase
    HashPassword,
    /// Enroll a principal: keypair, credentials, encrypted salary
    Enroll(EnrollArgs),
    /// Authenticate, unlock keys and show decrypted login attributes
    Login { login_name: String },
    /// Encrypted exam scores
    #[command(subcommand)]
    Grade(GradeCommand),
    /// Print audit events as JSON lines
    Audit {
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD), defaults to --from
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only events concerning this principal
        #[arg(long)]
        principal: Option<String>,
    },
}

#[derive(Args)]
struct EnrollArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    login: String,
    #[arg(long)]
    salary: Option<u64>,
    #[arg(long)]
    overwrite: bool,
}

#[derive(Subcommand)]
enum GradeCommand {
    /// Record a score, encrypted for the logged-in principal
    Add {
        #[arg(long)]
        login: String,
        student_id: String,
        course_id: String,
        score: f64,
    },
    /// Show scores for one course
    Show {
        #[arg(long)]
        login: String,
        course_id: String,
        student_ids: Vec<String>,
    },
}

struct Vault {
    keys: Arc<KeyManager>,
    paths: VaultPaths,
}

impl Vault {
    fn open(config: &VaultConfig) -> VaultResult<Self> {
        let paths = VaultPaths::new(&config.data_dir);
        let keys = KeyManager::open(paths.clone(), config.kdf)?.with_audit_log();
        Ok(Self {
            keys: Arc::new(keys),
            paths,
        })
    }

    fn records(&self) -> VaultResult<Arc<RecordDatabase>> {
        Ok(Arc::new(RecordDatabase::open(&self.paths.record_db())?))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init(LogFormat::default());
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> VaultResult<VaultConfig> {
    let mut config = VaultConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if cli.kdf.is_some() || cli.kdf_cost.is_some() {
        config.kdf = KdfProfile::parse(cli.kdf.as_deref(), cli.kdf_cost.as_deref())?;
    }
    Ok(config)
}

fn read_passphrase(var: &str) -> VaultResult<Passphrase> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(Passphrase::new(value)),
        _ => Err(VaultError::Usage(format!(
            "passphrase variable {var} is not set or empty"
        ))),
    }
}

async fn run(cli: Cli, config: VaultConfig) -> VaultResult<()> {
    info!(data_dir = %config.data_dir.display(), kdf = ?config.kdf, "records vault starting");
    let vault = Vault::open(&config)?;
    let passphrase_env = cli.passphrase_env;

    match cli.command {
        Command::Keygen {
            principal_id,
            force,
        } => {
            if vault.keys.has_key(&principal_id) && !force {
                return Err(RecordsError::KeyExists(principal_id).into());
            }
            let passphrase = read_passphrase(&passphrase_env)?;
            let keys = Arc::clone(&vault.keys);
            let (location, public_pem) =
                offload(move || keys.generate_key_pair(&principal_id, &passphrase)).await??;
            eprintln!("private key written to {}", location.display());
            print!("{public_pem}");
        }

        Command::Encrypt {
            plaintext,
            principal,
            public_key,
            out,
        } => {
            let pem_text = match (principal, public_key) {
                (Some(id), _) => vault.records()?.get_public_key(&id)?,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(StorageError::from)?,
                (None, None) => {
                    return Err(VaultError::Usage("--principal or --public-key is required".into()))
                }
            };
            let key = KeyManager::load_public_key(&pem_text)?;
            let ciphertext = offload(move || CipherCodec::encrypt(&key, &plaintext)).await??;
            match out {
                Some(path) => std::fs::write(&path, &ciphertext).map_err(StorageError::from)?,
                None => println!("{}", CipherCodec::encode_for_storage(&ciphertext)),
            }
        }

        Command::Decrypt {
            principal_id,
            ciphertext,
            input,
        } => {
            let ciphertext = match (input, ciphertext) {
                (Some(path), _) => std::fs::read(&path).map_err(StorageError::from)?,
                (None, Some(text)) => CipherCodec::decode_from_storage(&text)?,
                (None, None) => {
                    return Err(VaultError::Usage("a ciphertext or --in is required".into()))
                }
            };
            let passphrase = read_passphrase(&passphrase_env)?;
            let keys = Arc::clone(&vault.keys);
            let plaintext = offload(move || -> VaultResult<String> {
                let key = keys.load_private_key(&principal_id, &passphrase)?;
                Ok(CipherCodec::decrypt(&key, &ciphertext)?)
            })
            .await??;
            println!("{plaintext}");
        }

        Command::HashPassword => {
            let passphrase = read_passphrase(&passphrase_env)?;
            let digest = CipherCodec::hash_password(passphrase.expose());
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            println!("{hex}");
        }

        Command::Enroll(args) => {
            let passphrase = read_passphrase(&passphrase_env)?;
            let records = vault.records()?;
            let keys = Arc::clone(&vault.keys);
            let principal = NewPrincipal {
                principal_id: args.id,
                full_name: args.name,
                email: args.email,
                login_name: args.login,
                salary: args.salary,
            };
            let enrolled = offload(move || {
                enroll_principal(&keys, records.as_ref(), principal, &passphrase, args.overwrite)
            })
            .await??;
            eprintln!(
                "enrolled {} (key at {})",
                enrolled.principal_id,
                enrolled.key_location.display()
            );
            print!("{}", enrolled.public_key_pem);
        }

        Command::Login { login_name } => {
            let passphrase = read_passphrase(&passphrase_env)?;
            let records = vault.records()?;
            let keys = Arc::clone(&vault.keys);
            let outcome = offload(move || -> VaultResult<_> {
                let record = authenticate(records.as_ref(), &login_name, &passphrase)?;
                let mut session = SessionKeyContext::new(keys);
                Ok(session.login(&record, passphrase)?)
            })
            .await??;

            println!("principal: {}", outcome.principal_id);
            println!("keys: {:?}", outcome.key_status);
            for enrichment in &outcome.enrichments {
                match (enrichment.status, enrichment.value()) {
                    (EnrichmentStatus::Decrypted, Some(value)) => {
                        println!("{}: {value}", enrichment.attribute)
                    }
                    (status, _) => println!("{}: *** ({status:?})", enrichment.attribute),
                }
            }
        }

        Command::Grade(command) => {
            let passphrase = read_passphrase(&passphrase_env)?;
            let records = vault.records()?;
            let keys = Arc::clone(&vault.keys);
            offload(move || run_grade_command(command, keys, records, passphrase)).await??;
        }

        Command::Audit {
            from,
            to,
            principal,
        } => {
            let audit = vault
                .keys
                .audit()
                .ok_or_else(|| VaultError::Usage("audit log is not enabled".into()))?;
            let from = from.unwrap_or_else(|| Utc::now().date_naive());
            let to = to.unwrap_or(from);
            if to < from {
                return Err(VaultError::Usage("--to must not precede --from".into()));
            }
            for event in audit.read_events_range(from, to)? {
                if principal
                    .as_deref()
                    .is_some_and(|id| event.principal_id.as_deref() != Some(id))
                {
                    continue;
                }
                println!("{}", serde_json::to_string(&event).map_err(StorageError::from)?);
            }
        }
    }

    Ok(())
}

fn run_grade_command(
    command: GradeCommand,
    keys: Arc<KeyManager>,
    records: Arc<RecordDatabase>,
    passphrase: Passphrase,
) -> VaultResult<()> {
    let login_name = match &command {
        GradeCommand::Add { login, .. } | GradeCommand::Show { login, .. } => login.clone(),
    };
    let record = authenticate(records.as_ref(), &login_name, &passphrase)?;
    let mut session = SessionKeyContext::new(keys);
    session.login(&record, passphrase)?;

    let book = GradeBook::new(records);
    match command {
        GradeCommand::Add {
            student_id,
            course_id,
            score,
            ..
        } => {
            let stored = book.record_grade(&session, &student_id, &course_id, score)?;
            println!("stored {stored}");
        }
        GradeCommand::Show {
            course_id,
            student_ids,
            ..
        } => {
            let refs = student_ids
                .iter()
                .map(|student| RecordRef::grade(student, &course_id))
                .collect::<Result<Vec<_>, _>>()?;
            for grade in book.read_grades(&session, &refs) {
                println!("{}\t{}", grade.record.key, grade.view);
            }
        }
    }
    Ok(())
}
