use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dat1_chat::{dispatch, ui, ChatSession, Mode, ProxyClient, SessionEvent};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Parser)]
#[command(name = "dat1-chat", version, about = "Chat with a dat1-hosted model through the proxy")]
struct Cli {
    /// Base URL of the running dat1-proxy
    #[arg(long, env = "DAT1_PROXY_URL", default_value = "http://127.0.0.1:3001")]
    proxy_url: String,

    #[arg(long, value_enum, default_value_t = Mode::Streaming)]
    mode: Mode,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Send one message, print the reply to stdout and exit
    #[arg(long)]
    prompt: Option<String>,
}

struct App {
    session: ChatSession,
    client: ProxyClient,
    tx: mpsc::Sender<SessionEvent>,
    task: Option<JoinHandle<()>>,
    running: bool,
}

impl App {
    fn submit(&mut self) {
        match self.session.begin_send() {
            Ok(work) => {
                let client = self.client.clone();
                let tx = self.tx.clone();
                self.task = Some(tokio::spawn(async move {
                    dispatch(&client, work, tx).await;
                }));
            }
            Err(e) => self.session.last_error = Some(e.to_string()),
        }
    }

    fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.session.reset();
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if ctrl => self.running = false,
            KeyCode::Char('r') if ctrl => self.reset(),
            KeyCode::Tab => self.session.mode = self.session.mode.toggle(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.session.input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.session.input.push(c),
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut session = ChatSession::new(cli.mode);
    session.temperature = cli.temperature;
    session.max_tokens = cli.max_tokens;
    let client = ProxyClient::new(&cli.proxy_url);

    match cli.prompt {
        Some(prompt) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "dat1_chat=warn".into()),
                )
                .with_writer(io::stderr)
                .init();
            session.input = prompt;
            one_shot(session, client).await
        }
        None => run_tui(session, client).await,
    }
}

async fn one_shot(mut session: ChatSession, client: ProxyClient) -> Result<()> {
    let work = session.begin_send()?;
    let (tx, mut rx) = mpsc::channel(32);
    tokio::spawn(async move { dispatch(&client, work, tx).await });

    let mut stdout = io::stdout();
    let mut printed = 0;
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        session.apply(event);

        if let Some(reply) = session.messages.iter().skip(1).last() {
            let fresh = reply.content.get(printed..).unwrap_or_default();
            write!(stdout, "{fresh}")?;
            stdout.flush()?;
            printed = reply.content.len();
        }
        if terminal {
            break;
        }
    }
    writeln!(stdout)?;

    if let Some(error) = session.last_error {
        anyhow::bail!(error);
    }
    if let Some(metadata) = session.messages.last().and_then(|m| m.metadata.as_deref()) {
        eprintln!("{metadata}");
    }
    Ok(())
}

async fn run_tui(session: ChatSession, client: ProxyClient) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel(32);
    let app = App {
        session,
        client,
        tx,
        task: None,
        running: true,
    };
    let result = event_loop(&mut terminal, app, rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    mut rx: mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();

    while app.running {
        terminal.draw(|f| ui::draw(f, &app.session))?;

        tokio::select! {
            Some(event) = rx.recv() => app.session.apply(event),
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.on_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    if let Some(task) = app.task.take() {
        task.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let (tx, _rx) = mpsc::channel(1);
        App {
            session: ChatSession::new(Mode::Streaming),
            client: ProxyClient::new("http://127.0.0.1:9"),
            tx,
            task: None,
            running: true,
        }
    }

    #[test]
    fn control_chords_do_not_type() {
        let mut app = app();
        app.on_key(KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE));
        app.on_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        app.on_key(KeyEvent::new(KeyCode::Char('I'), KeyModifiers::SHIFT));
        assert_eq!(app.session.input, "hI");
        assert!(app.running);
    }

    #[test]
    fn ctrl_r_resets_and_ctrl_c_quits() {
        let mut app = app();
        app.session.messages.push(shared::ChatMessage::user("old"));
        app.on_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert!(app.session.messages.is_empty());
        assert!(app.session.input.is_empty());

        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.running);
    }
}
