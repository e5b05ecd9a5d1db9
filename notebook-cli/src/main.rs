//! `notebook`: command-line host for the Notebook core library.

mod settings;

use clap::{Parser, Subcommand};
use notebook_core::{
    AccessPolicy, CancellationToken, DeleteResult, HierarchyStore, Identity, Note, NotebookError,
    Page, Session, SqliteStore, StoreError, Workbook,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::settings::AppSettings;

#[derive(Debug, Parser)]
#[command(name = "notebook", version, about = "Workbooks, pages and notes")]
struct Cli {
    /// SQLite database to use instead of the configured one.
    #[arg(long, env = "NOTEBOOK_DB", global = true)]
    db: Option<PathBuf>,

    /// User id supplied by the identity provider.
    #[arg(long, env = "NOTEBOOK_USER", global = true)]
    user: Option<String>,

    /// Email supplied by the identity provider.
    #[arg(long, env = "NOTEBOOK_EMAIL", global = true)]
    email: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    #[command(flatten)]
    Notebook(NotebookCommand),
}

/// Commands that need a signed-in session and an open database.
#[derive(Debug, Subcommand)]
enum NotebookCommand {
    /// Manage workbooks.
    Workbook {
        #[command(subcommand)]
        action: WorkbookCommand,
    },
    /// Manage pages inside a workbook.
    Page {
        #[command(subcommand)]
        action: PageCommand,
    },
    /// Manage notes inside a page.
    Note {
        #[command(subcommand)]
        action: NoteCommand,
    },
    /// Most recently edited notes across all workbooks.
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
enum WorkbookCommand {
    List,
    Create { name: String },
    Delete { workbook: String },
    Search { term: String },
}

#[derive(Debug, Subcommand)]
enum PageCommand {
    List {
        workbook: String,
    },
    Create {
        workbook: String,
        name: String,
    },
    Delete {
        workbook: String,
        page: String,
    },
    /// Search page names across every workbook.
    Search {
        term: String,
    },
}

#[derive(Debug, Subcommand)]
enum NoteCommand {
    List {
        workbook: String,
        page: String,
        /// Only notes whose title or text contains this.
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        workbook: String,
        page: String,
        note: String,
    },
    Create {
        workbook: String,
        page: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        text: String,
    },
    Edit {
        workbook: String,
        page: String,
        note: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        text: String,
    },
    Duplicate {
        workbook: String,
        page: String,
        note: String,
    },
    Delete {
        workbook: String,
        page: String,
        note: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    Show,
    Set {
        /// Where the SQLite database lives.
        #[arg(long = "database-path")]
        database_path: Option<PathBuf>,
        /// Add an email to the sign-in allow-list.
        #[arg(long = "allow-email")]
        allow_email: Vec<String>,
        /// Let anyone sign in.
        #[arg(long)]
        clear_allowed: bool,
        #[arg(long)]
        recent_limit: Option<usize>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Notebook(#[from] NotebookError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Settings(String),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Notebook(e) => e.user_message(),
            Self::Store(e) => e.to_string(),
            Self::Usage(msg) | Self::Settings(msg) => msg.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{e:?}");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = settings::load_settings();
    let out = Printer { json: cli.json };

    let command = match cli.command {
        Command::Config { action } => return configure(settings, action, &out),
        Command::Notebook(command) => command,
    };

    let session = sign_in(&settings, cli.user, cli.email)?;
    let db_path = cli
        .db
        .unwrap_or_else(|| PathBuf::from(&settings.database_path));
    let hierarchy = open_hierarchy(&db_path)?;
    let owner = session.owner_id();

    match command {
        NotebookCommand::Workbook { action } => match action {
            WorkbookCommand::List => out.workbooks(&hierarchy.list_workbooks(owner).await?),
            WorkbookCommand::Create { name } => {
                out.workbooks(&[hierarchy.create_workbook(owner, &name).await?])
            }
            WorkbookCommand::Delete { workbook } => {
                hierarchy.authorize_workbook(&session, &workbook).await?;
                let cancel = cancel_on_ctrl_c();
                let result = hierarchy
                    .delete_workbook_cancellable(&workbook, &cancel)
                    .await?;
                out.deleted(&result)
            }
            WorkbookCommand::Search { term } => {
                out.workbooks(&hierarchy.search_workbooks(owner, &term).await?)
            }
        },
        NotebookCommand::Page { action } => match action {
            PageCommand::List { workbook } => {
                hierarchy.authorize_workbook(&session, &workbook).await?;
                out.pages(&hierarchy.list_pages(&workbook).await?)
            }
            PageCommand::Create { workbook, name } => {
                hierarchy.authorize_workbook(&session, &workbook).await?;
                out.pages(&[hierarchy.create_page(&workbook, &name).await?])
            }
            PageCommand::Delete { workbook, page } => {
                hierarchy.authorize_workbook(&session, &workbook).await?;
                let cancel = cancel_on_ctrl_c();
                let result = hierarchy
                    .delete_page_cancellable(&workbook, &page, &cancel)
                    .await?;
                out.deleted(&result)
            }
            PageCommand::Search { term } => out.pages(&hierarchy.search_pages(owner, &term).await?),
        },
        NotebookCommand::Note { action } => run_note(&hierarchy, &session, action, &out).await?,
        NotebookCommand::Recent { limit } => {
            let limit = limit.unwrap_or(settings.recent_limit);
            out.notes(&hierarchy.recent_notes(owner, limit).await?)
        }
    }
    Ok(())
}

async fn run_note(
    hierarchy: &HierarchyStore,
    session: &Session,
    action: NoteCommand,
    out: &Printer,
) -> Result<(), CliError> {
    match action {
        NoteCommand::List {
            workbook,
            page,
            search,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            let notes = match search {
                Some(term) => hierarchy.search_notes(&workbook, &page, &term).await?,
                None => hierarchy.list_notes(&workbook, &page).await?,
            };
            out.notes(&notes);
        }
        NoteCommand::Show {
            workbook,
            page,
            note,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            out.note_body(&hierarchy.get_note(&workbook, &page, &note).await?);
        }
        NoteCommand::Create {
            workbook,
            page,
            title,
            text,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            let created = hierarchy
                .create_note(&workbook, &page, &title, &text)
                .await?;
            out.notes(&[created]);
        }
        NoteCommand::Edit {
            workbook,
            page,
            note,
            title,
            text,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            let edited = hierarchy
                .update_note(&workbook, &page, &note, &title, &text)
                .await?;
            out.notes(&[edited]);
        }
        NoteCommand::Duplicate {
            workbook,
            page,
            note,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            out.notes(&[hierarchy.duplicate_note(&workbook, &page, &note).await?]);
        }
        NoteCommand::Delete {
            workbook,
            page,
            note,
        } => {
            hierarchy.authorize_workbook(session, &workbook).await?;
            out.deleted(&hierarchy.delete_note(&workbook, &page, &note).await?);
        }
    }
    Ok(())
}

fn sign_in(
    settings: &AppSettings,
    user: Option<String>,
    email: Option<String>,
) -> Result<Session, CliError> {
    let uid = user.ok_or_else(|| {
        CliError::Usage("sign in with --user <uid> (or NOTEBOOK_USER)".to_string())
    })?;
    let identity = Identity {
        uid,
        display_name: None,
        email,
        photo_url: None,
    };
    Ok(AccessPolicy::from_emails(&settings.allowed_emails).admit(identity)?)
}

fn open_hierarchy(path: &Path) -> Result<HierarchyStore, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(StoreError::from)?;
        }
    }
    let store = SqliteStore::open_or_create(path)?;
    log::debug!("using database {}", path.display());
    Ok(HierarchyStore::new(Arc::new(store)))
}

/// A token that fires when the user presses Ctrl-C, so long deletes stop between steps.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let watcher = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping after the current delete");
            watcher.cancel();
        }
    });
    token
}

fn configure(
    mut settings: AppSettings,
    action: ConfigCommand,
    out: &Printer,
) -> Result<(), CliError> {
    match action {
        ConfigCommand::Show => {}
        ConfigCommand::Set {
            database_path,
            allow_email,
            clear_allowed,
            recent_limit,
        } => {
            if let Some(path) = database_path {
                settings.database_path = path.to_string_lossy().to_string();
            }
            if clear_allowed {
                settings.allowed_emails.clear();
            }
            for email in allow_email {
                if !settings
                    .allowed_emails
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(&email))
                {
                    settings.allowed_emails.push(email);
                }
            }
            if let Some(limit) = recent_limit {
                settings.recent_limit = limit;
            }
            settings::save_settings(&settings).map_err(CliError::Settings)?;
        }
    }
    out.settings(&settings);
    Ok(())
}

struct Printer {
    json: bool,
}

impl Printer {
    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => log::error!("could not serialize output: {e}"),
            }
        }
        self.json
    }

    fn workbooks(&self, workbooks: &[Workbook]) {
        if self.emit(workbooks) {
            return;
        }
        for wb in workbooks {
            println!("{}  {}", wb.id, wb.name);
        }
    }

    fn pages(&self, pages: &[Page]) {
        if self.emit(pages) {
            return;
        }
        for page in pages {
            println!(
                "{}  {}  (workbook {})",
                page.id, page.name, page.workbook_id
            );
        }
    }

    fn notes(&self, notes: &[Note]) {
        if self.emit(notes) {
            return;
        }
        for note in notes {
            let title = if note.title.is_empty() {
                "(untitled)"
            } else {
                note.title.as_str()
            };
            let modified = note.last_modified.format("%Y-%m-%d %H:%M:%S");
            println!("{}  {title}  last modified {modified}", note.id);
        }
    }

    fn note_body(&self, note: &Note) {
        if self.emit(note) {
            return;
        }
        println!("{}", note.title);
        println!("{}", note.text);
    }

    fn deleted(&self, result: &DeleteResult) {
        if self.emit(result) {
            return;
        }
        println!("deleted {} item(s)", result.deleted_count);
    }

    fn settings(&self, settings: &AppSettings) {
        if self.emit(settings) {
            return;
        }
        let file = settings::settings_file_path();
        println!("settings file: {}", file.display());
        println!("database:      {}", settings.database_path);
        if settings.allowed_emails.is_empty() {
            println!("sign-in:       anyone");
        } else {
            println!("sign-in:       {}", settings.allowed_emails.join(", "));
        }
        println!("recent limit:  {}", settings.recent_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_note_create() {
        let args = "notebook --user u1 note create wb pg --title A --text <p>hi</p>";
        let cli = Cli::try_parse_from(args.split(' ')).unwrap();
        assert_eq!(cli.user.as_deref(), Some("u1"));
        match cli.command {
            Command::Notebook(NotebookCommand::Note {
                action: NoteCommand::Create { title, text, .. },
            }) => {
                assert_eq!(title, "A");
                assert_eq!(text, "<p>hi</p>");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_sign_in_requires_user() {
        let err = sign_in(&AppSettings::default(), None, None).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_sign_in_honours_allow_list() {
        let settings = AppSettings {
            allowed_emails: vec!["me@example.com".to_string()],
            ..AppSettings::default()
        };
        assert!(sign_in(&settings, Some("u1".into()), Some("ME@example.com".into())).is_ok());
        let err = sign_in(&settings, Some("u2".into()), Some("x@example.com".into())).unwrap_err();
        assert!(matches!(
            err,
            CliError::Notebook(NotebookError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_open_hierarchy_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("notebook.db");
        let hierarchy = open_hierarchy(&path).unwrap();
        hierarchy.create_workbook("u1", "Personal").await.unwrap();
        assert!(path.exists());
    }
}
