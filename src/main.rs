use backend_client::BackendClient;
use gui::App;
use iced::{Application, Settings};
use leadswipe_core::{AppConfig, CoreError, ErrorReporter, ReviewConfig};

fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter("leadswipe=debug,leadswipe_core=debug,backend_client=debug,gui=debug")
        .init();

    tracing::info!("Starting Leadswipe");

    let reporter = ErrorReporter::new("startup");
    let config = AppConfig::load().map_err(|e| {
        reporter.report(&e);
        e
    })?;
    let client = BackendClient::new(&config.backend).map_err(|e| {
        reporter.report(&e);
        e
    })?;
    backend_client::install(client)?;

    let settings = Settings {
        window: iced::window::Settings {
            size: iced::Size::new(900.0, 800.0),
            min_size: Some(iced::Size::new(640.0, 560.0)),
            ..Default::default()
        },
        ..Settings::with_flags(config.review)
    };

    LeadswipeApp::run(settings).map_err(|e| {
        tracing::error!("Application error: {}", e);
        CoreError::Internal {
            message: format!("GUI error: {e}"),
        }
    })
}

struct LeadswipeApp {
    app: App,
}

impl Application for LeadswipeApp {
    type Message = gui::Message;
    type Theme = iced::Theme;
    type Executor = iced::executor::Default;
    type Flags = ReviewConfig;

    fn new(flags: Self::Flags) -> (Self, iced::Command<Self::Message>) {
        tracing::info!("Initializing application");
        let (app, command) = App::new(flags);
        (Self { app }, command)
    }

    fn title(&self) -> String {
        "Leadswipe - Lead Review".to_string()
    }

    fn update(&mut self, message: Self::Message) -> iced::Command<Self::Message> {
        self.app.update(message)
    }

    fn view(&self) -> iced::Element<Self::Message> {
        self.app.view()
    }

    fn subscription(&self) -> iced::Subscription<Self::Message> {
        self.app.subscription()
    }
}
