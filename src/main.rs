use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use skinpro_engine::assessment::{severity_model_loader, SEVERITY_SOURCE_ID};
use skinpro_engine::{
    AssessmentEngine, AssessmentResult, EngineConfig, EngineError, Profile, Recommendation,
    RemedyCatalog, RemedyRanker,
};
use tracing::{info, Level};

/// Assess an acne photo and print the assessment with a matching care plan as JSON.
#[derive(Parser, Debug)]
#[command(name = "skinpro", version)]
struct Cli {
    /// Photo to assess (PNG or JPEG).
    image: PathBuf,

    /// Optional profile JSON with diet, stress, routine and other answers.
    profile: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    assessment: AssessmentResult,
    recommendation: Recommendation,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();
}

fn read(path: &Path) -> Result<Vec<u8>, EngineError> {
    fs::read(path).map_err(|e| EngineError::ReadError(e, path.display().to_string()))
}

fn load_profile(path: Option<&Path>) -> Result<Profile, EngineError> {
    match path {
        Some(path) => {
            let bytes = read(path)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                EngineError::MalformedInput(format!("profile {}: {e}", path.display()))
            })
        }
        None => Ok(Profile::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let cli = Cli::parse();
    init_logging();

    let configuration = EngineConfig::from_env()?;
    let profile = load_profile(cli.profile.as_deref())?;
    let bytes = read(&cli.image)?;

    let engine = AssessmentEngine::builder(configuration.clone())
        .with_classifier(
            SEVERITY_SOURCE_ID,
            severity_model_loader(&configuration.models_dir),
        )
        .build();
    let engine = Arc::new(engine);
    let ranker = RemedyRanker::new(Arc::new(RemedyCatalog::load(&configuration)?), &configuration);

    info!("Assessing {}", cli.image.display());
    let assessment = tokio::task::spawn_blocking(move || engine.assess_bytes(&bytes))
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;

    let recommendation = ranker.recommend(&assessment, &profile);
    let report = Report {
        assessment,
        recommendation,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_image_with_optional_profile() {
        let cli = Cli::try_parse_from(["skinpro", "face.png"]).unwrap();
        assert_eq!(cli.image, PathBuf::from("face.png"));
        assert!(cli.profile.is_none());

        let cli = Cli::try_parse_from(["skinpro", "face.png", "me.json"]).unwrap();
        assert_eq!(cli.profile, Some(PathBuf::from("me.json")));
    }

    #[test]
    fn test_missing_image_and_help_are_not_paths() {
        let err = Cli::try_parse_from(["skinpro"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["skinpro", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
