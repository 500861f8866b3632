pub mod assignments;

pub mod files;

pub mod submissions;

pub mod ws;

pub use assignments::configure_assignments_routes;
pub use files::configure_file_routes;
pub use submissions::configure_submissions_routes;
pub use ws::configure_ws_routes;
