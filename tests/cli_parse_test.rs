//! Integration tests for command-line parsing and the file-based commands

use clap::Parser;
use cosmos_samples::cli::commands::init::InitArgs;
use cosmos_samples::cli::commands::validate::ValidateArgs;
use cosmos_samples::cli::commands::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use cosmos_samples::cli::{Cli, Commands};
use cosmos_samples::samples::{IndexDemo, ScriptDemo};
use tempfile::TempDir;

#[test]
fn test_parse_query_with_seed() {
    let cli = Cli::parse_from(["cosmos-samples", "-c", "local.toml", "query", "--seed"]);
    assert_eq!(cli.config, "local.toml");
    match cli.command {
        Commands::Query(args) => assert!(args.seed),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_index_demos() {
    let cli = Cli::parse_from([
        "cosmos-samples",
        "index",
        "--demo",
        "use-lazy-indexing",
        "--demo",
        "ExcludePathsFromIndex",
    ]);
    match cli.command {
        Commands::Index(args) => assert_eq!(
            args.selected(),
            vec![IndexDemo::UseLazyIndexing, IndexDemo::ExcludePathsFromIndex]
        ),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_scripts_demo() {
    let cli = Cli::parse_from(["cosmos-samples", "scripts", "--demo", "post-trigger"]);
    match cli.command {
        Commands::Scripts(args) => assert_eq!(args.selected(), vec![ScriptDemo::PostTrigger]),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_unknown_demo_is_rejected() {
    let result = Cli::try_parse_from(["cosmos-samples", "index", "--demo", "rebuild"]);
    assert!(result.is_err());
}

#[test]
fn test_missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["cosmos-samples"]).is_err());
}

#[tokio::test]
async fn test_init_then_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cosmos-samples.toml");
    let output = path.to_string_lossy().to_string();

    let init = InitArgs {
        output: output.clone(),
        force: false,
    };
    assert_eq!(init.execute().await.unwrap(), EXIT_SUCCESS);
    // A second init without --force leaves the file alone
    assert_eq!(init.execute().await.unwrap(), EXIT_CONFIG_ERROR);

    // The generated file references an unset key variable until edited
    std::env::remove_var("COSMOS_SAMPLES_KEY");
    assert_eq!(
        ValidateArgs {}.execute(&output).await.unwrap(),
        EXIT_CONFIG_ERROR
    );

    let contents = std::fs::read_to_string(&path)
        .unwrap()
        .replace("${COSMOS_SAMPLES_KEY}", "dGVzdC1rZXk=");
    std::fs::write(&path, contents).unwrap();
    assert_eq!(ValidateArgs {}.execute(&output).await.unwrap(), EXIT_SUCCESS);
}
