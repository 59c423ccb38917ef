//! Command-line grammar: nouns, verbs and global flags.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "littera",
    about = "Littera — literature meets refactoring",
    version
)]
pub struct Cli {
    /// Emit structured JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the planned effect without touching any state
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Confirm destructive operations on non-empty parents
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Commands {
    /// Initialize a new work in a directory
    Init {
        /// Directory for the new work (defaults to the current directory)
        path: Option<PathBuf>,

        /// Cluster port (defaults to an unused port in the reserved range)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show cluster state and content counts for this work
    Status,

    /// Work-level operations
    Work {
        #[command(subcommand)]
        command: WorkCommands,
    },

    /// Document operations
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Section operations
    Section {
        #[command(subcommand)]
        command: SectionCommands,
    },

    /// Block operations
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },

    /// Entity operations (labels, properties, notes included)
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },

    /// Mention operations
    Mention {
        #[command(subcommand)]
        command: MentionCommands,
    },

    /// Block alignment operations
    Alignment {
        #[command(subcommand)]
        command: AlignmentCommands,
    },

    /// Review operations
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// Export the work
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Import into the work
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Embedded database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Preview surface-form generation without touching the database
    Inflect(InflectArgs),
}

#[derive(Subcommand)]
pub enum WorkCommands {
    /// Show the work record
    Show,
    /// Update work fields
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Default language tag
        #[arg(long)]
        language: Option<String>,
    },
    /// Delete the work and everything it owns
    Delete,
}

#[derive(Subcommand)]
pub enum DocCommands {
    /// Add a document
    Add { title: String },
    /// List documents
    List,
    /// Show one document
    Show { document: String },
    /// Update document fields
    Set {
        document: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Move a document to a 1-based position
    Move { document: String, position: usize },
    /// Delete a document
    Delete { document: String },
}

#[derive(Subcommand)]
pub enum SectionCommands {
    /// Add a section to a document
    Add {
        document: String,
        title: String,
        /// Parent section selector for nesting
        #[arg(long)]
        parent: Option<String>,
    },
    /// List sections of a document
    List { document: String },
    /// Update section fields
    Set {
        document: String,
        section: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Move a section to a 1-based position among its siblings
    Move {
        document: String,
        section: String,
        position: usize,
    },
    /// Delete a section
    Delete { document: String, section: String },
}

#[derive(Subcommand)]
pub enum BlockCommands {
    /// Add a block to a section
    Add {
        section: String,
        text: String,
        #[arg(long, short = 'l', default_value = "en")]
        lang: String,
    },
    /// List blocks of a section
    List { section: String },
    /// Show one block in full
    Show { block: String },
    /// Replace a block's source text
    SetText { block: String, text: String },
    /// Move a block to a 1-based position within its section
    Move { block: String, position: usize },
    /// Delete a block
    Delete { block: String },
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Add an entity
    Add { entity_type: String, name: String },
    /// List entities
    List,
    /// Show one entity in full
    Show { entity: String },
    /// Update entity fields
    Set {
        entity: String,
        #[arg(long = "type")]
        entity_type: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an entity (cascades to labels, overlays and mentions)
    Delete { entity: String },

    /// Intrinsic grammatical properties
    Property {
        #[command(subcommand)]
        command: PropertyCommands,
    },

    /// Work-scoped note
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Language-specific labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },
}

#[derive(Subcommand)]
pub enum PropertyCommands {
    /// Set properties (key=value pairs, merged into existing)
    Set {
        entity: String,
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// List properties
    List { entity: String },
    /// Remove one property
    Unset { entity: String, key: String },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Set the work-scoped note
    Set { entity: String, note: String },
    /// Show the work-scoped note
    Show { entity: String },
    /// Clear the work-scoped note
    Clear { entity: String },
}

#[derive(Subcommand)]
pub enum LabelCommands {
    /// Add a label for a language
    Add {
        entity: String,
        language: String,
        base_form: String,
        /// Alias surface forms (repeatable)
        #[arg(long = "alias")]
        aliases: Vec<String>,
    },
    /// List labels
    List { entity: String },
    /// Update a label
    Set {
        entity: String,
        language: String,
        #[arg(long)]
        base_form: Option<String>,
        /// Replace the alias set (repeatable)
        #[arg(long = "alias")]
        aliases: Option<Vec<String>>,
    },
    /// Delete a label
    Delete { entity: String, language: String },
}

#[derive(Subcommand)]
pub enum MentionCommands {
    /// Link a block to an entity
    Add {
        block: String,
        entity_type: String,
        name: String,
        /// Mention language (defaults to the block's language)
        #[arg(long)]
        lang: Option<String>,
        /// Observed surface form
        #[arg(long)]
        surface: Option<String>,
        /// Grammatical features (key=value, repeatable)
        #[arg(long = "feature")]
        features: Vec<String>,
    },
    /// List mentions
    List {
        #[arg(long)]
        block: Option<String>,
        #[arg(long)]
        entity: Option<String>,
    },
    /// Delete a mention by index or UUID
    Delete { selector: String },
}

#[derive(Subcommand)]
pub enum AlignmentCommands {
    /// Align two blocks in different languages
    Add {
        source_block: String,
        target_block: String,
        #[arg(long, short = 't', default_value = "translation")]
        r#type: String,
    },
    /// List alignments
    List {
        #[arg(long, short = 'b')]
        block: Option<String>,
    },
    /// Delete an alignment by index or UUID
    Delete { selector: String },
    /// Report entities missing labels in aligned languages
    Gaps {
        #[arg(long, short = 'b')]
        block: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// Add a review finding
    Add {
        description: String,
        /// Scope kind: work|document|section|block|entity|alignment
        #[arg(long, short = 's')]
        scope: Option<String>,
        /// Scope target selector
        #[arg(long)]
        scope_id: Option<String>,
        /// Issue type tag
        #[arg(long = "type", short = 't')]
        issue_type: Option<String>,
        #[arg(long, default_value = "medium")]
        severity: String,
        /// Extra metadata (key=value, repeatable)
        #[arg(long = "metadata", short = 'm')]
        metadata: Vec<String>,
    },
    /// List reviews
    List,
    /// Delete a review by index or UUID
    Delete { selector: String },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export the entire work as JSON
    Json {
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Export the work as Markdown
    Markdown {
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import a work from a JSON export
    Json { file: PathBuf },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Show embedded cluster status for this work
    Status,
    /// Start the embedded cluster
    Start {
        /// Override lease duration in seconds (0 disables the lease)
        #[arg(long)]
        lease_seconds: Option<u64>,
    },
    /// Stop the embedded cluster
    Stop {
        /// Stop mode: smart | fast | immediate
        #[arg(long, default_value = "fast")]
        mode: String,
    },
    /// Show or set the idle lease
    Lease { seconds: Option<u64> },
    /// Allocate a fresh cluster port and record it
    ReallocatePort,
    /// Reset the write-ahead log (potentially lossy; keeps committed data)
    ResetWal,
    /// Destroy and re-create the cluster data directory
    Reinit,
    /// Internal: stop the cluster after lease expiry
    #[command(hide = true)]
    WatchLease {
        #[arg(long)]
        littera_dir: PathBuf,
    },
}

#[derive(Args)]
pub struct InflectArgs {
    /// Base form of the word
    pub base_form: String,

    /// Language code
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Pluralize
    #[arg(long)]
    pub plural: bool,

    /// Possessive (English only)
    #[arg(long)]
    pub possessive: bool,

    /// Article: a | the (English only)
    #[arg(long)]
    pub article: Option<String>,

    /// Case: plain|poss (en) or nom|gen|dat|acc|inst|loc|voc (pl)
    #[arg(long)]
    pub case: Option<String>,

    /// Gender: m1|m2|m3|f|n (Polish only)
    #[arg(long)]
    pub gender: Option<String>,

    /// Countability: yes | no (English only)
    #[arg(long)]
    pub countable: Option<String>,

    /// Part of speech: verb | adj (English only)
    #[arg(long)]
    pub pos: Option<String>,

    /// Verb tense (English only)
    #[arg(long)]
    pub tense: Option<String>,

    /// Verb person (English only)
    #[arg(long)]
    pub person: Option<String>,

    /// Adjective degree: comparative | superlative (English only)
    #[arg(long)]
    pub degree: Option<String>,

    /// Print the rule trail and warnings
    #[arg(long)]
    pub explain: bool,
}
