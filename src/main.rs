#[cfg(not(target_arch = "wasm32"))]
mod app {
    use std::io::{self, BufRead, Write};
    use std::sync::mpsc::{self, RecvTimeoutError, Sender};
    use std::time::{Duration, Instant};

    use lapwatch::clock::now_ms;
    use lapwatch::file_store::FileStore;
    use lapwatch::input::{self, Command};
    use lapwatch::pump::ThreadPump;
    use lapwatch::ui::TerminalView;
    use lapwatch::{Config, StopwatchWidget, StoreError, WidgetEvent};

    type Widget = StopwatchWidget<FileStore, ThreadPump, TerminalView<io::Stdout>>;

    enum AppMsg {
        Widget(WidgetEvent),
        Line(String),
        Eof,
    }

    fn stdin_thread(main: Sender<AppMsg>) {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if main.send(AppMsg::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    log::error!("stdin: {}", e);
                    break;
                }
            }
        }
        main.send(AppMsg::Eof).ok();
    }

    /// Feeds writes made by other processes back into the widget.
    fn sync_external(widget: &mut Widget) {
        match widget.store_mut().poll_changes() {
            Ok(changes) => {
                for change in changes {
                    widget.handle(WidgetEvent::StorageChanged(change), now_ms());
                }
            }
            Err(e) => log::error!("Failed to poll store: {}", e),
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_line(widget: &mut Widget, line: &str) -> bool {
        let command = match input::parse(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("\n{}", e);
                return true;
            }
        };
        match command {
            Command::Quit => return false,
            Command::Help => println!("\n{}", input::HELP),
            _ => match input::to_event(&command, widget.view().snapshot()) {
                Ok(Some(event)) => widget.handle(event, now_ms()),
                Ok(None) => {}
                Err(e) => eprintln!("\n{}", e),
            },
        }
        true
    }

    pub fn run() -> Result<(), StoreError> {
        let config = Config::from_env();
        let store = FileStore::open(&config.store_path)?;
        log::info!("lapwatch using store {}", store.path().display());

        let (tx, rx) = mpsc::channel();
        let pump = ThreadPump::spawn(tx.clone(), |handle| AppMsg::Widget(WidgetEvent::Tick(handle)));
        std::thread::spawn(move || stdin_thread(tx));

        let view = TerminalView::new(io::stdout());
        let mut widget = StopwatchWidget::create(store, pump, view, &config, now_ms());

        let poll_every = Duration::from_millis(config.poll_interval_ms);
        let mut last_poll = Instant::now();

        loop {
            let mut handled_line = false;
            match rx.recv_timeout(poll_every) {
                Ok(AppMsg::Widget(event)) => widget.handle(event, now_ms()),
                Ok(AppMsg::Line(line)) => {
                    if !handle_line(&mut widget, &line) {
                        break;
                    }
                    handled_line = true;
                }
                Ok(AppMsg::Eof) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if handled_line || last_poll.elapsed() >= poll_every {
                sync_external(&mut widget);
                last_poll = Instant::now();
            }
        }

        widget.teardown();
        println!();
        io::stdout().flush().ok();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("lapwatch PID is {}", std::process::id());

    if let Err(e) = app::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
