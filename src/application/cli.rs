use std::io;
use std::path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use dialoguer::Select;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use super::host::LineHost;
use super::progress::TerminalProgress;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::configuration::FileSettings;
use crate::configuration::SettingKey;
use crate::configuration::SettingsStore;
use crate::domain::models::HostHook;
use crate::domain::models::Project;
use crate::domain::services::Composition;
use crate::domain::services::EventBindings;
use crate::domain::services::HeartbeatComposer;
use crate::domain::services::RequestScheduler;
use crate::domain::services::Tracker;
use crate::domain::services::TrackerContext;
use crate::infrastructure::api::ApiClient;
use crate::infrastructure::api::KeyValidation;
use crate::infrastructure::vcs::Git;

/// Everything a command needs, wired from the loaded config.
struct Services {
    context: Arc<TrackerContext>,
    scheduler: RequestScheduler,
    host: Arc<LineHost>,
    git: Arc<Git>,
    api: Arc<ApiClient>,
}

impl Services {
    fn load() -> Result<Services> {
        let settings_file = path::PathBuf::from(Config::get(ConfigKey::SettingsFile));
        let settings: Arc<dyn SettingsStore> = Arc::new(FileSettings::open(settings_file)?);

        let context = Arc::new(TrackerContext::new(settings.clone()));
        let scheduler = RequestScheduler::default();
        let host = Arc::new(LineHost::new(
            &Config::get(ConfigKey::AppName),
            path::PathBuf::from(Config::get(ConfigKey::ProjectDir)),
        ));
        let git = Arc::new(Git::new(settings, host.clone()));
        let api = Arc::new(ApiClient::new(
            &Config::get(ConfigKey::ApiURL),
            context.clone(),
            scheduler.clone(),
            host.clone(),
        ));

        return Ok(Services {
            context,
            scheduler,
            host,
            git,
            api,
        });
    }

    fn composer(&self) -> HeartbeatComposer {
        return HeartbeatComposer::new(self.context.clone(), self.host.clone(), self.git.clone());
    }

    /// Refreshes the project list and waits for it to land in the context.
    async fn fetch_projects(&self) -> Result<Vec<Project>> {
        if self.api.list_projects().is_none() {
            bail!("The API key has not been validated. Run `wakabeat validate` first.");
        }
        self.scheduler.flush().await;

        return Ok(self.context.projects());
    }
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }

    let visible = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<char>>()
        .into_iter()
        .rev()
        .collect::<String>();

    return format!("****{visible}");
}

fn format_project(project: &Project, active: &Option<Project>) -> String {
    let marker = if active.as_ref() == Some(project) {
        "*"
    } else {
        "-"
    };

    return format!("{marker} {} (ID: {})", project.name, project.id);
}

async fn validate(services: &Services, matches: &ArgMatches) -> Result<()> {
    let key = match matches.get_one::<String>("key") {
        Some(key) => key.to_string(),
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("WakaTime API key")
            .allow_empty_password(true)
            .interact()?,
    };

    let progress = TerminalProgress::new();
    match services.api.validate_key(&key, &progress).await {
        KeyValidation::Empty => {
            println!("No API key given, heartbeats stay disabled until one is validated.");
        }
        KeyValidation::Valid(user) => {
            println!("{} Logged in as {}", Paint::green("✔"), user.label());
            let projects = services.fetch_projects().await?;
            if let Some(project) = services.context.active_project() {
                println!("Tracking time against {} ({} projects available)", project.name, projects.len());
            }
        }
        KeyValidation::Invalid(err) => {
            bail!("The API key was rejected: {err}");
        }
        KeyValidation::Failed => {
            bail!("Could not reach the API to validate the key. Check the api-url setting and your connection.");
        }
        KeyValidation::Cancelled => {
            println!("Validation cancelled.");
        }
    }

    return Ok(());
}

async fn list_projects(services: &Services) -> Result<()> {
    let projects = services.fetch_projects().await?;
    if projects.is_empty() {
        println!("There are no projects available.");
        return Ok(());
    }

    let active = services.context.active_project();
    let res = projects
        .iter()
        .map(|project| return format_project(project, &active))
        .collect::<Vec<String>>()
        .join("\n");
    println!("{res}");

    return Ok(());
}

async fn select_project(services: &Services, matches: &ArgMatches) -> Result<()> {
    let projects = services.fetch_projects().await?;

    if let Some(name) = matches.get_one::<String>("name") {
        if !services.context.select_project_by_name(name) {
            bail!(format!("No project named {name}"));
        }
        println!("Selected project {name}");
        return Ok(());
    }

    let mut options = vec!["(none)".to_string()];
    options.extend(projects.iter().map(|project| return project.name.to_string()));

    let active = services.context.active_project();
    let current = projects
        .iter()
        .position(|project| return Some(project) == active.as_ref())
        .map(|idx| return idx + 1)
        .unwrap_or(0);

    let idx = match Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which project should heartbeats be attributed to?")
        .default(current)
        .items(&options)
        .interact_opt()?
    {
        Some(idx) => idx,
        None => return Ok(()),
    };

    if idx == 0 {
        services.context.select_project(None);
        println!("Cleared the active project");
    } else {
        let project = &projects[idx - 1];
        services.context.select_project(Some(project));
        println!("Selected project {}", project.name);
    }

    return Ok(());
}

async fn send_heartbeat(services: &Services, matches: &ArgMatches) -> Result<()> {
    let entity = matches.get_one::<String>("entity").cloned();
    let is_write = matches.get_flag("write");
    services.host.set_document(entity.as_deref());

    match services
        .composer()
        .compose(is_write, HeartbeatComposer::now())
        .await
    {
        Composition::Skipped(reason) => {
            println!("Heartbeat skipped: {reason}");
        }
        Composition::Suppressed => {
            println!("Heartbeat suppressed as a duplicate");
        }
        Composition::Ready(heartbeat) => {
            services.api.post_heartbeat(&heartbeat)?;
            services.scheduler.flush().await;
            println!(
                "Sent heartbeat for {} (project: {}, branch: {})",
                heartbeat.entity, heartbeat.project, heartbeat.branch
            );
        }
    }

    return Ok(());
}

fn settings(services: &Services, matches: &ArgMatches) -> Result<()> {
    let context = &services.context;
    let settings = context.settings();

    match matches.subcommand() {
        Some(("enable", _)) => {
            context.set_enabled(true);
            println!("Tracking enabled");
        }
        Some(("disable", _)) => {
            context.set_enabled(false);
            println!("Tracking disabled");
        }
        Some(("git-enable", _)) => {
            settings.set_bool(SettingKey::GitEnabled, true);
            println!("Git branch detection enabled");
        }
        Some(("git-disable", _)) => {
            settings.set_bool(SettingKey::GitEnabled, false);
            println!("Git branch detection disabled");
        }
        Some(("show", _)) => {
            let project = context
                .active_project()
                .map(|project| return format!("{} (ID: {})", project.name, project.id))
                .unwrap_or_else(|| return "(none)".to_string());

            println!("enabled: {}", context.is_enabled());
            println!("api-key: {}", mask_key(&context.api_key()));
            println!("api-key-validated: {}", context.is_key_validated());
            println!("git-enabled: {}", services.git.is_enabled());
            println!("project: {project}");
            println!("settings-file: {}", Config::get(ConfigKey::SettingsFile));
        }
        _ => {
            subcommand_settings().print_long_help()?;
        }
    }

    return Ok(());
}

/// Tracks events read from stdin until the input closes or Ctrl-C.
async fn watch(services: Services) -> Result<()> {
    let tick_interval = Config::get(ConfigKey::TickInterval).parse::<u64>()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<HostHook>();

    let tracker = Tracker::new(
        services.context.clone(),
        services.composer(),
        services.api.clone(),
        services.scheduler.clone(),
        EventBindings::new(services.host.clone(), tx),
        Duration::from_millis(tick_interval.max(1)),
    );
    tracker.initialize();

    let stdin = BufReader::new(tokio::io::stdin());
    let res = tokio::select! {
        res = tracker.start(&mut rx) => res,
        res = services.host.run(stdin) => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    while let Ok(hook) = rx.try_recv() {
        tracker.handle_event(hook).await;
    }
    tracker.flush().await;

    return res;
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_projects() -> Command {
    return Command::new("projects")
        .about("List and select the project heartbeats are attributed to.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("Fetches and lists your projects. The active one is marked with *."))
        .subcommand(
            Command::new("select")
                .about("Selects the active project. Omit passing a name to pick one interactively.")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Exact project name")
                        .num_args(1),
                ),
        );
}

fn subcommand_settings() -> Command {
    return Command::new("settings")
        .about("Manage the persisted tracker settings.")
        .arg_required_else_help(true)
        .subcommand(Command::new("enable").about("Turns heartbeat tracking on."))
        .subcommand(Command::new("disable").about("Turns heartbeat tracking off."))
        .subcommand(Command::new("git-enable").about("Attributes heartbeats to the current git branch."))
        .subcommand(Command::new("git-disable").about("Stops running git, heartbeats use the default branch."))
        .subcommand(Command::new("show").about("Prints the current settings."));
}

fn subcommand_validate() -> Command {
    return Command::new("validate")
        .about("Validates an API key and stores it. Prompts for the key when none is given.")
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .env("WAKABEAT_API_KEY")
                .help("WakaTime API key")
                .num_args(1),
        );
}

fn subcommand_heartbeat() -> Command {
    return Command::new("heartbeat")
        .about("Sends a single heartbeat for a document.")
        .arg(
            Arg::new("entity")
                .short('e')
                .long("entity")
                .help("Path of the document being worked on. Omit for an unsaved document.")
                .num_args(1),
        )
        .arg(
            Arg::new("write")
                .short('w')
                .long("write")
                .help("Marks the heartbeat as a save.")
                .action(ArgAction::SetTrue),
        );
}

fn subcommand_watch() -> Command {
    return Command::new("watch")
        .about("Tracks host events read line by line from stdin, e.g. `saved Assets/Main.unity` or `reload`.");
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("wakabeat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_heartbeat())
        .subcommand(subcommand_projects())
        .subcommand(subcommand_settings())
        .subcommand(subcommand_validate())
        .subcommand(subcommand_watch())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("WAKABEAT_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::ApiURL.to_string())
                .long(ConfigKey::ApiURL.to_string())
                .env("WAKABEAT_API_URL")
                .num_args(1)
                .help(format!("WakaTime compatible API URL. [default: {}]", Config::default(ConfigKey::ApiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::AppName.to_string())
                .long(ConfigKey::AppName.to_string())
                .env("WAKABEAT_APP_NAME")
                .num_args(1)
                .help("Application name, auto selects the project with the same name. [default: name of the project directory]")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ProjectDir.to_string())
                .long(ConfigKey::ProjectDir.to_string())
                .env("WAKABEAT_PROJECT_DIR")
                .num_args(1)
                .help("Directory git runs in to detect the branch. [default: current directory]")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SettingsFile.to_string())
                .long(ConfigKey::SettingsFile.to_string())
                .env("WAKABEAT_SETTINGS_FILE")
                .num_args(1)
                .help(format!("Path to the persisted settings file. [default: {}]", Config::default(ConfigKey::SettingsFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::TickInterval.to_string())
                .long(ConfigKey::TickInterval.to_string())
                .env("WAKABEAT_TICK_INTERVAL")
                .num_args(1)
                .help(format!("Milliseconds between scheduler ticks while watching. [default: {}]", Config::default(ConfigKey::TickInterval)))
                .global(true),
        );
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some(("heartbeat", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            send_heartbeat(&Services::load()?, subcmd_matches).await?;
        }
        Some(("projects", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("list", list_matches)) => {
                Config::load(vec![&matches, subcmd_matches, list_matches]).await?;
                list_projects(&Services::load()?).await?;
            }
            Some(("select", select_matches)) => {
                Config::load(vec![&matches, subcmd_matches, select_matches]).await?;
                select_project(&Services::load()?, select_matches).await?;
            }
            _ => {
                subcommand_projects().print_long_help()?;
            }
        },
        Some(("settings", subcmd_matches)) => {
            let mut all_matches = vec![&matches, subcmd_matches];
            if let Some((_, nested)) = subcmd_matches.subcommand() {
                all_matches.push(nested);
            }
            Config::load(all_matches).await?;
            settings(&Services::load()?, subcmd_matches)?;
        }
        Some(("validate", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            validate(&Services::load()?, subcmd_matches).await?;
        }
        Some(("watch", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            watch(Services::load()?).await?;
        }
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(());
}
