use chatline::prelude::*;
use chatline::{DEFAULT_LOGIN, DEFAULT_PASSWORD};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Chat from the terminal. Type a line to send it; `/quit` disconnects.
#[derive(Debug, Clone, Parser)]
#[command(name = "terminal-chat")]
struct Config {
    /// Chat server host.
    #[arg(long, default_value = "127.0.0.1", env = "CHATLINE_HOST")]
    host: String,

    /// Chat server port.
    #[arg(long, default_value_t = 8181, env = "CHATLINE_PORT")]
    port: u16,

    /// Login to authenticate as.
    #[arg(long, default_value = DEFAULT_LOGIN, env = "CHATLINE_LOGIN")]
    login: String,

    /// Password for the login.
    #[arg(long, default_value = DEFAULT_PASSWORD, env = "CHATLINE_PASSWORD")]
    password: String,
}

impl Config {
    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Frontend
// ---------------------------------------------------------------------------

/// History on stdout, everything else on stderr.
#[derive(Debug, Default)]
struct Terminal {
    logged_in: bool,
}

impl Frontend for Terminal {
    fn show_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn append_history(&mut self, entry: HistoryEntry) {
        println!("{entry}");
    }

    fn set_logged_in(&mut self, logged_in: bool) {
        if self.logged_in != logged_in {
            self.logged_in = logged_in;
            eprintln!("-- {} --", if logged_in { "logged in" } else { "logged out" });
        }
    }
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let config = Config::parse();
    chatline::init_tracing();

    let mut terminal = Terminal::default();
    let result = run(&config, &mut terminal).await;
    if supervise(&mut terminal, result).is_none() {
        std::process::exit(1);
    }
}

async fn run(config: &Config, terminal: &mut Terminal) -> Result<(), ChatlineError> {
    let (mut client, mut events) = ChatClient::<&mut Terminal>::builder()
        .address(config.address())
        .login(config.login.as_str())
        .password(config.password.as_str())
        .connect(terminal)
        .await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => event.dispatch_to(&mut client).await,
                None => break,
            },
            line = stdin.next_line(), if input_open => match line? {
                Some(line) if line.trim() == "/quit" => client.disconnect().await,
                Some(line) => {
                    let result = client.send_chat(&line).await;
                    supervise(client.frontend_mut(), result);
                }
                None => {
                    input_open = false;
                    client.disconnect().await;
                }
            },
            _ = tokio::signal::ctrl_c() => client.disconnect().await,
        }
    }
    Ok(())
}
