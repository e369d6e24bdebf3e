//! Command-line front end for the data loader.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::DataLoader;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::{container_for_source, UploadArtifact};
use crate::domain::workflow_run::{RunOutcome, WorkflowRunStatus};
use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::loader_service::LoaderServiceClient;

pub const DEFAULT_CLI_SOURCE: &str = "founderhub";

#[derive(Parser, Debug)]
#[command(
    name = "data-loader",
    version,
    about = "Upload lead files to Azure Blob Storage and check the ingestion Logic App"
)]
pub struct Cli {
    /// Talk to a running data-loader-server instead of Azure directly.
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload one file into the container for its source.
    Upload {
        file: PathBuf,
        /// founderhub, crunchbase or others; anything else lands in the others container.
        #[arg(long, default_value = DEFAULT_CLI_SOURCE)]
        source: String,
        /// Report the status of this workflow's latest run afterwards.
        #[arg(long, value_name = "WORKFLOW")]
        check_status: Option<String>,
    },
    /// Show the status of a workflow's most recent run.
    Status { workflow_name: String },
}

pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload a CSV file.";

pub async fn run(cli: Cli) -> Result<()> {
    let loader: Arc<dyn DataLoader> = match &cli.server {
        Some(url) => Arc::new(LoaderServiceClient::new(url)?),
        None => crate::app::build_azure_loader(&LoaderConfig::load()?)?,
    };
    execute(loader.as_ref(), cli.command, &mut std::io::stdout()).await
}

/// Runs one command against `loader`, reporting on `out`. A failed upload or
/// status lookup is reported and then returned as an error so the process
/// exits non-zero.
pub async fn execute(loader: &dyn DataLoader, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Upload {
            file,
            source,
            check_status,
        } => {
            if !upload_file(loader, out, &file, &source).await? {
                return Err(AppError::StorageError(format!(
                    "upload of {} did not complete",
                    file.display()
                )));
            }
            if let Some(name) = check_status {
                if !report_status(loader, out, &name).await? {
                    return Err(AppError::WorkflowError(format!(
                        "status of {} unavailable",
                        name
                    )));
                }
            }
        }
        Command::Status { workflow_name } => {
            if !report_status(loader, out, &workflow_name).await? {
                return Err(AppError::WorkflowError(format!(
                    "status of {} unavailable",
                    workflow_name
                )));
            }
        }
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads and uploads `path`, which must be a `.csv` file. Upload failures
/// are reported on `out` and come back as `Ok(false)`; only a write to
/// `out` can fail the call.
pub async fn upload_file(
    loader: &dyn DataLoader,
    out: &mut impl Write,
    path: &Path,
    source: &str,
) -> Result<bool> {
    if !is_csv(path) {
        writeln!(out, "{}", INVALID_FILE_TYPE)?;
        return Ok(false);
    }
    let filename = display_name(path);
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(err) => {
            writeln!(out, "Failed to upload file: could not read {}: {}", path.display(), err)?;
            return Ok(false);
        }
    };

    writeln!(
        out,
        "Uploading {} to Azure Blob Storage container: {}...",
        filename,
        container_for_source(source)
    )?;
    match loader
        .upload(UploadArtifact::new(filename.clone(), source, content))
        .await
    {
        Ok(receipt) => {
            writeln!(out, "File '{}' uploaded successfully!", receipt.filename)?;
            Ok(true)
        }
        Err(err) => {
            tracing::error!("Upload of {} failed: {}", filename, err);
            writeln!(out, "Failed to upload file: {}", err.message())?;
            Ok(false)
        }
    }
}

pub fn write_status(out: &mut impl Write, name: &str, status: &WorkflowRunStatus) -> Result<()> {
    writeln!(out, "Status of last run (`{}`): {}", name, status.status)?;
    match status.outcome() {
        RunOutcome::Errored(error) => writeln!(out, "Error: {}", error)?,
        RunOutcome::Succeeded => writeln!(out, "Logic App run completed successfully!")?,
        RunOutcome::Running => {
            writeln!(out, "Logic App is still running. Please check again later.")?
        }
        RunOutcome::NoRuns | RunOutcome::Other => {}
    }
    Ok(())
}

/// Looks up and prints the workflow's latest run. Lookup failures are
/// reported on `out` and come back as `Ok(false)`.
pub async fn report_status(
    loader: &dyn DataLoader,
    out: &mut impl Write,
    workflow_name: &str,
) -> Result<bool> {
    match loader.workflow_status(workflow_name).await {
        Ok(status) => {
            write_status(out, workflow_name, &status)?;
            Ok(true)
        }
        Err(err) => {
            tracing::error!("Status lookup for {} failed: {}", workflow_name, err);
            writeln!(out, "Failed to get Logic App status: {}", err.message())?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::upload::UploadReceipt;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLoader {
        uploads: Mutex<Vec<UploadArtifact>>,
        upload_error: Option<AppError>,
        status: Option<WorkflowRunStatus>,
    }

    #[async_trait]
    impl DataLoader for FakeLoader {
        async fn upload(&self, artifact: UploadArtifact) -> Result<UploadReceipt> {
            if let Some(err) = &self.upload_error {
                return Err(err.clone());
            }
            let receipt = UploadReceipt {
                filename: artifact.filename.clone(),
                container: artifact.container().to_string(),
            };
            self.uploads.lock().unwrap().push(artifact);
            Ok(receipt)
        }

        async fn workflow_status(&self, _workflow_name: &str) -> Result<WorkflowRunStatus> {
            self.status
                .clone()
                .ok_or_else(|| AppError::WorkflowError("AuthorizationFailed".to_string()))
        }
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn status(status: &str, error: Option<&str>) -> WorkflowRunStatus {
        WorkflowRunStatus {
            status: status.to_string(),
            error: error.map(str::to_string),
            name: Some("08584".to_string()),
        }
    }

    #[test]
    fn test_cli_parses_upload_with_defaults() {
        let cli = Cli::try_parse_from(["data-loader", "upload", "leads.csv"]).unwrap();
        assert!(cli.server.is_none());
        match cli.command {
            Command::Upload {
                file,
                source,
                check_status,
            } => {
                assert_eq!(file, PathBuf::from("leads.csv"));
                assert_eq!(source, "founderhub");
                assert!(check_status.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_status_with_server() {
        let cli = Cli::try_parse_from([
            "data-loader",
            "status",
            "dsilaslogicapp",
            "--server",
            "http://localhost:8000",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://localhost:8000"));
        assert!(matches!(cli.command, Command::Status { ref workflow_name } if workflow_name == "dsilaslogicapp"));
    }

    #[tokio::test]
    async fn test_upload_reports_container_and_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q3.csv");
        std::fs::write(&path, b"name\nContoso\n").unwrap();
        let loader = FakeLoader::default();
        let mut out = Vec::new();

        let ok = upload_file(&loader, &mut out, &path, "crunchbase").await.unwrap();

        assert!(ok);
        assert_eq!(
            output(out),
            "Uploading q3.csv to Azure Blob Storage container: dsilas-crunchbase...\n\
             File 'q3.csv' uploaded successfully!\n"
        );
        let uploads = loader.uploads.lock().unwrap();
        assert_eq!(uploads[0].content, b"name\nContoso\n");
        assert_eq!(uploads[0].source, "crunchbase");
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q3.csv");
        std::fs::write(&path, b"x").unwrap();
        let loader = FakeLoader {
            upload_error: Some(AppError::StorageError("AuthorizationFailure".to_string())),
            ..Default::default()
        };
        let mut out = Vec::new();

        let ok = upload_file(&loader, &mut out, &path, "others").await.unwrap();

        assert!(!ok);
        assert!(output(out).ends_with("Failed to upload file: AuthorizationFailure\n"));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_without_upload() {
        let loader = FakeLoader::default();
        let mut out = Vec::new();
        let ok = upload_file(&loader, &mut out, Path::new("/nonexistent/leads.csv"), "others")
            .await
            .unwrap();
        assert!(!ok);
        assert!(output(out).starts_with("Failed to upload file: could not read"));
        assert!(loader.uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_status_messages_per_outcome() {
        let mut out = Vec::new();
        write_status(&mut out, "wf", &status("Succeeded", None)).unwrap();
        assert_eq!(
            output(out),
            "Status of last run (`wf`): Succeeded\nLogic App run completed successfully!\n"
        );

        let mut out = Vec::new();
        write_status(&mut out, "wf", &status("Running", None)).unwrap();
        assert!(output(out).ends_with("Logic App is still running. Please check again later.\n"));

        let mut out = Vec::new();
        write_status(&mut out, "wf", &status("Failed", Some("ActionFailed"))).unwrap();
        assert!(output(out).ends_with("Error: ActionFailed\n"));

        let mut out = Vec::new();
        write_status(&mut out, "wf", &WorkflowRunStatus::no_runs()).unwrap();
        assert_eq!(output(out), "Status of last run (`wf`): No runs found\n");
    }

    #[tokio::test]
    async fn test_status_lookup_failure_is_reported() {
        let loader = FakeLoader::default();
        let mut out = Vec::new();
        let ok = report_status(&loader, &mut out, "wf").await.unwrap();
        assert!(!ok);
        assert_eq!(
            output(out),
            "Failed to get Logic App status: AuthorizationFailed\n"
        );
    }

    #[tokio::test]
    async fn test_non_csv_file_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.xlsx");
        std::fs::write(&path, b"PK").unwrap();
        let loader = FakeLoader::default();
        let mut out = Vec::new();

        let ok = upload_file(&loader, &mut out, &path, "founderhub").await.unwrap();

        assert!(!ok);
        assert_eq!(output(out), "Invalid file type. Please upload a CSV file.\n");
        assert!(loader.uploads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_csv_extension_is_case_insensitive() {
        assert!(is_csv(Path::new("Leads.CSV")));
        assert!(is_csv(Path::new("dir/q3.csv")));
        assert!(!is_csv(Path::new("q3.csv.txt")));
        assert!(!is_csv(Path::new("csv")));
    }

    #[tokio::test]
    async fn test_upload_then_check_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q3.csv");
        std::fs::write(&path, b"name\n").unwrap();
        let loader = FakeLoader {
            status: Some(status("Running", None)),
            ..Default::default()
        };
        let mut out = Vec::new();

        execute(
            &loader,
            Command::Upload {
                file: path,
                source: "others".to_string(),
                check_status: Some("dsilaslogicapp".to_string()),
            },
            &mut out,
        )
        .await
        .unwrap();

        let text = output(out);
        assert!(text.contains("File 'q3.csv' uploaded successfully!\n"));
        assert!(text.ends_with(
            "Status of last run (`dsilaslogicapp`): Running\n\
             Logic App is still running. Please check again later.\n"
        ));
    }

    #[tokio::test]
    async fn test_failed_upload_skips_status_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q3.csv");
        std::fs::write(&path, b"name\n").unwrap();
        let loader = FakeLoader {
            upload_error: Some(AppError::StorageError("quota exceeded".to_string())),
            status: Some(status("Succeeded", None)),
            ..Default::default()
        };
        let mut out = Vec::new();

        let err = execute(
            &loader,
            Command::Upload {
                file: path,
                source: "others".to_string(),
                check_status: Some("dsilaslogicapp".to_string()),
            },
            &mut out,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::StorageError(_)));
        assert!(!output(out).contains("Status of last run"));
    }

    #[tokio::test]
    async fn test_status_command_errors_when_lookup_fails() {
        let loader = FakeLoader::default();
        let mut out = Vec::new();
        let err = execute(
            &loader,
            Command::Status {
                workflow_name: "wf".to_string(),
            },
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::WorkflowError(_)));
        assert!(output(out).starts_with("Failed to get Logic App status:"));
    }
}
