use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use devops_testgen::config::{AppConfig, ProjectOverride};
use devops_testgen::llm::LlmClient;
use devops_testgen::request::{
    CreateTestsRequest, CreateTestsResponse, DeleteTestsRequest, DeleteTestsResponse,
    parse_body, ErrorResponse, RawId, RequestHandler, ResourceRef,
};
use devops_testgen::{Error, Result};

#[derive(Parser)]
#[command(
    name = "devops-testgen",
    version,
    about = "Generate test cases for Azure DevOps user stories with an LLM and link them to the story."
)]
struct Cli {
    #[arg(long, global = true, help = "Path to config.json (default: ./config.json)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Azure DevOps organization for this run")]
    organization: Option<String>,

    #[arg(long, global = true, help = "Azure DevOps project for this run")]
    project: Option<String>,

    #[arg(long, global = true, default_value_t = false, help = "Only print JSON")]
    json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Generate test cases for a user story, create them and link them to it
    Create {
        id: String,

        #[arg(
            long,
            default_value_t = false,
            help = "Delete currently linked test cases first"
        )]
        replace_existing: bool,
    },

    /// Remove tested-by links from a user story
    Delete {
        id: String,

        #[arg(
            long,
            default_value_t = false,
            help = "Delete the linked test case work items instead of only unlinking"
        )]
        purge: bool,
    },

    /// Handle a JSON request body, as posted by a service hook
    Request {
        #[arg(value_enum)]
        kind: RequestKind,

        #[arg(long, default_value = "-", help = "Request body file, '-' for stdin")]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RequestKind {
    Create,
    Delete,
}

enum Outcome {
    Created(CreateTestsResponse),
    Deleted(DeleteTestsResponse),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let json_only = cli.json;

    match run(cli) {
        Ok(outcome) => {
            if let Err(e) = report(&outcome, json_only) {
                error!(error = %e, "failed to write output");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "request failed");
            let body = ErrorResponse::from(&e);
            match serde_json::to_string_pretty(&body) {
                Ok(text) => println!("{text}"),
                Err(_) => eprintln!("{e}"),
            }
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let llm = LlmClient::new(config.openai.clone())?;
    let handler = RequestHandler::new(
        &config.azure_devops,
        &config.azure_devops,
        &llm,
        &config.test_case,
    );

    let flag_override = project_override(cli.organization, cli.project);

    match cli.command {
        CliCommand::Create {
            id,
            replace_existing,
        } => {
            let req = CreateTestsRequest {
                resource: Some(ResourceRef {
                    id: Some(RawId::Text(id)),
                }),
                azure_config: flag_override,
                replace_existing,
            };
            handler.create_tests(&req).map(Outcome::Created)
        }

        CliCommand::Delete { id, purge } => {
            let req = DeleteTestsRequest {
                work_item_id: Some(RawId::Text(id)),
                azure_config: flag_override,
                purge,
            };
            handler.delete_tests(&req).map(Outcome::Deleted)
        }

        CliCommand::Request { kind, file } => {
            let body = read_body(&file)?;
            match kind {
                RequestKind::Create => {
                    let mut req: CreateTestsRequest = parse_body(&body)?;
                    req.azure_config = req.azure_config.or(flag_override);
                    handler.create_tests(&req).map(Outcome::Created)
                }
                RequestKind::Delete => {
                    let mut req: DeleteTestsRequest = parse_body(&body)?;
                    req.azure_config = req.azure_config.or(flag_override);
                    handler.delete_tests(&req).map(Outcome::Deleted)
                }
            }
        }
    }
}

fn project_override(organization: Option<String>, project: Option<String>) -> Option<ProjectOverride> {
    if organization.is_none() && project.is_none() {
        return None;
    }
    Some(ProjectOverride {
        organization,
        project,
    })
}

fn read_body(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        io::stdin().read_to_string(&mut body)?;
        return Ok(body);
    }
    fs::read_to_string(path).map_err(Error::from)
}

fn report(outcome: &Outcome, json_only: bool) -> Result<()> {
    match outcome {
        Outcome::Created(resp) => {
            if !json_only {
                println!("created: {} test case(s)", resp.created_cases.len());
                for tc in &resp.created_cases {
                    println!("  ID: {} | Name: {}", tc.id, tc.name);
                }
                println!();
            }
            print_json(resp)
        }
        Outcome::Deleted(resp) => {
            if !json_only {
                println!("{} ({})", resp.message, resp.deleted_count);
                println!();
            }
            print_json(resp)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
