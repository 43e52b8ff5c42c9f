use crate::cli::commands::{
    AdminAction, Commands, ConfigAction, DocsAction, MaterialsAction, SubjectsAction,
};
use crate::cli::handlers;
use crate::client::Session;
use crate::config::CliConfig;
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::PathBuf;

/// CLIL CLI - lesson materials from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "clil",
    author = "CLIL Team",
    version,
    about = "Command-line client for the CLIL lesson-material backend",
    long_about = "Command-line client for the CLIL lesson-material backend.

QUICK START:
  clil login                              # Sign in
  clil materials generate quiz \"Volcanoes\" # Generate a material
  clil materials ls                       # List stored materials

DOCUMENTS:
  clil docs upload notes.pdf --subject Geography
  clil docs query \"What causes eruptions?\"

CONFIGURATION:
  clil config show                        # Show merged configuration
  clil config path                        # Show config file location"
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CLIL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let config = CliConfig::load(self.config.as_deref())?;
        let json = self.json || config.output.json;
        if !config.output.color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        // Configuration commands never touch the backend or the session
        if let Commands::Config { action } = &self.command {
            return match action {
                ConfigAction::Show => handlers::config::handle_show(&config, json),
                ConfigAction::Path => handlers::config::handle_path(self.config.as_deref()),
            };
        }

        let mut session = Session::open(&config).await?;

        match self.command {
            Commands::Login { username, password } => {
                handlers::auth::handle_login(&mut session, username, password, json).await
            }
            Commands::Register {
                username,
                email,
                password,
            } => handlers::auth::handle_register(&mut session, username, email, password, json).await,
            Commands::Logout => handlers::auth::handle_logout(&mut session).await,
            Commands::Whoami => handlers::auth::handle_whoami(&session, json),

            Commands::Materials { action } => match action {
                MaterialsAction::Ls { kind, kinds } => {
                    handlers::materials::handle_ls(&mut session, kind, kinds, json).await
                }
                MaterialsAction::Show { id, output } => {
                    handlers::materials::handle_show(&mut session, id, output, json).await
                }
                MaterialsAction::Rm { id, yes } => {
                    handlers::materials::handle_rm(&mut session, id, yes).await
                }
                MaterialsAction::Generate { options } => {
                    handlers::materials::handle_generate(&mut session, options, json).await
                }
            },

            Commands::Subjects { action } => match action {
                SubjectsAction::Ls => handlers::subjects::handle_ls(&mut session, json).await,
                SubjectsAction::Add { name } => {
                    handlers::subjects::handle_add(&mut session, &name, json).await
                }
                SubjectsAction::Rm { id, yes } => {
                    handlers::subjects::handle_rm(&mut session, id, yes).await
                }
            },

            Commands::Docs { action } => match action {
                DocsAction::Upload { path, subject } => {
                    handlers::documents::handle_upload(&mut session, path, subject, json).await
                }
                DocsAction::Ls => handlers::documents::handle_ls(&mut session, json).await,
                DocsAction::Rm { ids, yes } => {
                    handlers::documents::handle_rm(&mut session, ids, yes, json).await
                }
                DocsAction::Query {
                    query,
                    top_k,
                    subject,
                } => handlers::documents::handle_query(&mut session, query, top_k, subject, json).await,
            },

            Commands::Admin { action } => match action {
                AdminAction::Users => handlers::admin::handle_users(&mut session, json).await,
                AdminAction::User { id } => handlers::admin::handle_user(&mut session, id, json).await,
                AdminAction::Roles { id, roles } => {
                    handlers::admin::handle_roles(&mut session, id, roles, json).await
                }
                AdminAction::Rm { id, yes } => handlers::admin::handle_rm(&mut session, id, yes).await,
                AdminAction::Stats => handlers::admin::handle_stats(&mut session, json).await,
            },

            Commands::Models => handlers::system::handle_models(&mut session, json).await,
            Commands::Health => handlers::system::handle_health(&mut session, json).await,
            // Dispatched before the session was opened
            Commands::Config { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["clil", "materials", "ls", "--json", "-c", "/tmp/c.toml"])
            .unwrap();

        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            args.command,
            Commands::Materials {
                action: MaterialsAction::Ls { kind: None, kinds: false }
            }
        ));
    }

    #[test]
    fn test_generate_defaults() {
        let args = Args::try_parse_from(["clil", "materials", "generate", "quiz", "Volcanoes"]).unwrap();

        let Commands::Materials {
            action: MaterialsAction::Generate { options },
        } = args.command
        else {
            panic!("expected generate");
        };
        assert_eq!(options.kind, "quiz");
        assert_eq!(options.topic, "Volcanoes");
        assert_eq!(options.level, "B1");
        assert_eq!(options.vocab, 30);
        assert_eq!(options.focus, "balanced");
        assert!(!options.use_docs);
    }

    #[test]
    fn test_docs_subject_requires_use_docs() {
        let result = Args::try_parse_from([
            "clil",
            "materials",
            "generate",
            "quiz",
            "Volcanoes",
            "--docs-subject",
            "Geography",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_docs_rm_needs_ids() {
        assert!(Args::try_parse_from(["clil", "docs", "rm"]).is_err());

        let args = Args::try_parse_from(["clil", "docs", "rm", "d1", "d2", "-y"]).unwrap();
        let Commands::Docs {
            action: DocsAction::Rm { ids, yes },
        } = args.command
        else {
            panic!("expected docs rm");
        };
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(yes);
    }

    #[test]
    fn test_verbosity_is_off_by_default() {
        let args = Args::try_parse_from(["clil", "health"]).unwrap();
        assert!(args.verbosity.log_level().is_none());

        let args = Args::try_parse_from(["clil", "-vv", "health"]).unwrap();
        assert!(args.verbosity.log_level().is_some());
    }
}
