//! Agent Chat command-line client
//!
//! Entry point for talking to the chat backend from a terminal.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use agent_chat_client::{
    Client, Error,
    app::{AppEvent, AppState, ChatController, Preferences, Speaker},
    config::{Cli, ClientConfig, Command},
    i18n::{self, Language},
    realtime::{ChannelKind, ConnectionState},
    types::SignupRequest,
};

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match ClientConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    info!(
        name: "client.config.loaded",
        api = %config.api.base_url,
        state_file = %config.storage.path,
        reconnect = config.realtime.reconnect.enabled,
        "Client configuration loaded"
    );

    let client = match Client::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let preferences = Preferences::load(client.store().as_ref());
    let command = cli.command.clone().unwrap_or(Command::Chat);

    if let Err(e) = run(&client, preferences, command).await {
        match e.downcast_ref::<Error>() {
            Some(err) => eprintln!("{}", err.user_message(preferences.language)),
            None => eprintln!("{e:#}"),
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output stays pipeable (M-LOG-STRUCTURED).
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(client: &Client, preferences: Preferences, command: Command) -> anyhow::Result<()> {
    let lang = preferences.language;
    match command {
        Command::Login { username, password } => {
            client.auth().login(&username, &password).await?;
            let user = client.auth().current_user().await?;
            let state = AppState::new(preferences).apply(AppEvent::LoggedIn(user));
            println!(
                "{}, {}",
                i18n::translate("welcome", lang),
                state.greeting_name().unwrap_or(&username)
            );
        }
        Command::Signup {
            username,
            password,
            full_name,
            email,
        } => {
            let mut profile = SignupRequest::new(username, password);
            if let Some(name) = full_name {
                profile = profile.full_name(name);
            }
            if let Some(email) = email {
                profile = profile.email(email);
            }
            client.auth().register(&profile).await?;
            println!("{}", i18n::translate("registrationSuccess", lang));
        }
        Command::Whoami => {
            let state = restore_session(client, preferences).await?;
            match state.user() {
                Some(user) => {
                    println!("{}", state.greeting_name().unwrap_or(&user.username));
                    if let Some(email) = &user.email {
                        println!("{email}");
                    }
                }
                None => println!("{}", i18n::translate("sessionExpired", lang)),
            }
        }
        Command::Logout => {
            client.auth().logout()?;
            println!("{}", i18n::translate("logout", lang));
        }
        Command::Conversations => {
            let conversations = client.conversations().list().await?;
            if conversations.is_empty() {
                println!("{}", i18n::translate("noConversations", lang));
            }
            for conv in conversations {
                println!(
                    "{}\t{}\t{}",
                    conv.id,
                    conv.message_count,
                    conv.display_title()
                );
            }
        }
        Command::History { conversation_id } => {
            let mut controller = ChatController::new(client.clone());
            controller.select(&conversation_id).await?;
            print_transcript(&controller, lang);
        }
        Command::Send {
            message,
            conversation,
            model,
        } => {
            let mut request = agent_chat_client::chat::SendMessage::new(message);
            if let Some(id) = conversation {
                request = request.in_conversation(id);
            }
            if let Some(model) = model {
                request = request.model(model);
            }
            let outcome = client.conversations().send_message(request).await?;
            println!("[{}]", outcome.conversation_id);
            println!("{}", i18n::resolve(&outcome.reply, lang));
        }
        Command::Rename {
            conversation_id,
            title,
        } => {
            client
                .conversations()
                .rename(&conversation_id, &title)
                .await?;
        }
        Command::Delete { conversation_id } => {
            client.conversations().delete(&conversation_id).await?;
        }
        Command::Chat => interactive_chat(client, preferences).await?,
        Command::Listen { channel } => listen(client, channel.into(), lang).await?,
        Command::Prefs {
            language,
            toggle_theme,
        } => {
            let mut state = AppState::new(preferences);
            if let Some(code) = language {
                let language: Language = code.parse().map_err(anyhow::Error::msg)?;
                state = state.apply(AppEvent::LanguageSelected(language));
            }
            if toggle_theme {
                state = state.apply(AppEvent::ThemeToggled);
            }
            state
                .preferences()
                .persist(client.store().as_ref())
                .context("saving preferences")?;
            let lang = state.language();
            println!(
                "{}: {}",
                i18n::translate("language", lang),
                lang.display_name()
            );
            println!(
                "{}: {}",
                i18n::translate("theme", lang),
                i18n::translate(state.theme().name(), lang)
            );
        }
        Command::Models => {
            let catalog = client.conversations().models().await?;
            for model in &catalog.available_models {
                let marker = if catalog.default_model.as_deref() == Some(model.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {model}");
            }
        }
        Command::Health => {
            let report = client.health().check().await?;
            println!(
                "{} {}",
                report.status,
                report.version.as_deref().unwrap_or_default()
            );
            let status = client.health().status().await?;
            let mut channels: Vec<_> = status.websocket_channels.into_iter().collect();
            channels.sort();
            for (channel, count) in channels {
                println!("  {channel}: {count}");
            }
        }
    }
    Ok(())
}

/// Resolve the stored credential into a user, treating rejection as logged out.
async fn restore_session(client: &Client, preferences: Preferences) -> anyhow::Result<AppState> {
    let state = AppState::new(preferences);
    match client.auth().current_user().await {
        Ok(user) => Ok(state.apply(AppEvent::SessionRestored(user))),
        Err(Error::Unauthenticated) => Ok(state.apply(AppEvent::SessionMissing)),
        Err(e) => Err(e.into()),
    }
}

fn print_transcript(controller: &ChatController, lang: Language) {
    for line in controller.view().transcript(lang) {
        let prefix = match line.speaker {
            Speaker::User => "you",
            Speaker::Assistant => "assistant",
            Speaker::System => "system",
            Speaker::Pending => "...",
            Speaker::Error => "error",
            Speaker::Notice => "",
        };
        if prefix.is_empty() {
            println!("{}", line.text);
        } else {
            println!("{prefix}> {}", line.text);
        }
    }
}

/// Line-oriented chat. `/new`, `/list`, `/open <id>`, `/rename <title>`,
/// `/delete` and `/quit` manage conversations; anything else is sent.
async fn interactive_chat(client: &Client, preferences: Preferences) -> anyhow::Result<()> {
    let state = restore_session(client, preferences).await?;
    let lang = state.language();
    let Some(name) = state.greeting_name() else {
        println!("{}", i18n::translate("sessionExpired", lang));
        return Ok(());
    };
    println!("{}, {name}", i18n::translate("welcome", lang));

    let mut controller = ChatController::new(client.clone());
    if let Err(e) = controller.refresh().await {
        eprintln!("{}", e.user_message(lang));
    }
    print_transcript(&controller, lang);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let result = match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            ("/quit", _) => break,
            ("/new", _) => {
                controller.new_conversation();
                Ok(())
            }
            ("/list", _) => {
                for conv in controller.view().conversations() {
                    let marker = if controller.view().selected() == Some(conv.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {}\t{}", conv.id, conv.display_title());
                }
                continue;
            }
            ("/open", id) => controller.select(id.trim()).await,
            ("/rename", title) => match controller.view().selected().map(str::to_owned) {
                Some(id) => controller.rename(&id, title).await,
                None => continue,
            },
            ("/delete", _) => match controller.view().selected().map(str::to_owned) {
                Some(id) => controller.delete(&id).await,
                None => continue,
            },
            _ => controller.send(line).await.map(|_| ()),
        };
        if let Err(e) = result {
            eprintln!("{}", e.user_message(lang));
        }
        print_transcript(&controller, lang);
    }
    Ok(())
}

/// Print state changes and frames of one channel; stdin lines are sent as
/// frames on channels that accept input.
async fn listen(client: &Client, kind: ChannelKind, lang: Language) -> anyhow::Result<()> {
    let mut channel = client.open_channel(kind);
    println!("{}", i18n::translate(kind.title_key(), lang));

    let mut states = channel.state_stream();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = channel.received_total();
    let mut stdin_open = kind.accepts_input();

    loop {
        tokio::select! {
            state = states.next() => {
                let Some(state) = state else { break };
                println!("-- {}", i18n::translate(state.label_key(), lang));
                // A retrying channel passes through Error while it backs off.
                if matches!(state, ConnectionState::Closed | ConnectionState::Error)
                    && channel.is_finished()
                {
                    break;
                }
            }
            _ = channel.wait_for_total(seen + 1) => {
                let (frames, total) = channel.messages_since_with_total(seen);
                for frame in frames {
                    println!("{frame}");
                }
                seen = total;
            }
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    Some(line) if !line.trim().is_empty() => channel.send(line),
                    Some(_) => {}
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.close().await;
    Ok(())
}
