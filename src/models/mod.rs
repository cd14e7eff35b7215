pub mod theme;
pub mod show;
pub mod dome;
pub mod session;
pub mod reservation;
pub mod ticket;

pub use theme::ShowTheme;
pub use show::AstronomyShow;
pub use dome::PlanetariumDome;
pub use session::ShowSession;
pub use reservation::Reservation;
pub use ticket::Ticket;
