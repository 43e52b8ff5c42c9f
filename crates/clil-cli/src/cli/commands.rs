use clap::Subcommand;
use std::path::PathBuf;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session locally
    Login {
        /// Account name (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "CLIL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(long, env = "CLIL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Manage lesson materials
    Materials {
        #[command(subcommand)]
        action: MaterialsAction,
    },

    /// Manage subjects
    Subjects {
        #[command(subcommand)]
        action: SubjectsAction,
    },

    /// Manage the document library used as generation context
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Administrative operations (requires the ADMIN role)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// List the generation models offered by the backend
    Models,

    /// Check that the backend is reachable and accepts the session
    Health,

    /// Inspect CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum MaterialsAction {
    /// List stored materials
    Ls {
        /// Only show one kind (worksheet, quiz, glossary, ...)
        #[arg(long)]
        kind: Option<String>,

        /// List the known material kinds instead
        #[arg(long, conflicts_with = "kind")]
        kinds: bool,
    },

    /// Show one material
    Show {
        id: u64,

        /// Write the formatted HTML to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a material
    Rm {
        id: u64,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate a new material with the language model
    Generate {
        #[command(flatten)]
        options: GenerateOptions,
    },
}

/// Parameters for material generation
#[derive(clap::Args, Debug)]
pub struct GenerateOptions {
    /// Material kind (worksheet, quiz, glossary, presentation, graphic, video)
    pub kind: String,

    /// Lesson topic
    pub topic: String,

    /// Additional instructions for the model
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    /// CEFR language level
    #[arg(long, default_value = "B1")]
    pub level: String,

    /// Share of subject vocabulary in percent
    #[arg(long, default_value_t = 30)]
    pub vocab: u32,

    /// Balance between language and subject content
    #[arg(long, default_value = "balanced")]
    pub focus: String,

    /// Leave out the vocabulary list
    #[arg(long)]
    pub no_vocab_list: bool,

    #[arg(long)]
    pub description: Option<String>,

    /// Model name (see `clil models`)
    #[arg(long)]
    pub model: Option<String>,

    /// Ground the material in uploaded documents
    #[arg(long)]
    pub use_docs: bool,

    /// Restrict document context to one subject
    #[arg(long, requires = "use_docs")]
    pub docs_subject: Option<String>,

    /// Write the formatted HTML to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SubjectsAction {
    /// List subjects
    Ls,

    /// Create a subject
    Add { name: String },

    /// Delete a subject
    Rm {
        id: u64,

        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// Upload a document (.pdf, .docx or .txt)
    Upload {
        path: PathBuf,

        /// Subject the document belongs to
        #[arg(long)]
        subject: Option<String>,
    },

    /// List uploaded documents
    Ls,

    /// Delete documents by id
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(short, long)]
        yes: bool,
    },

    /// Ask a question against the uploaded documents
    Query {
        query: String,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<u32>,

        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminAction {
    /// List user accounts
    Users,

    /// Show one user account
    User { id: u64 },

    /// Replace the roles of a user
    Roles {
        id: u64,

        /// New roles, e.g. USER ADMIN
        #[arg(required = true)]
        roles: Vec<String>,
    },

    /// Delete a user account
    Rm {
        id: u64,

        #[arg(short, long)]
        yes: bool,
    },

    /// Show system-wide counters
    Stats,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the merged configuration
    Show,

    /// Print the configuration file location
    Path,
}
