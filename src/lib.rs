pub mod censor;
pub mod config;
pub mod error;
pub mod remote_control;

pub use error::Error;
pub use remote_control::Client;

pub fn print_logo() {
    println!(
        "
     ██████╗███████╗███╗   ██╗███████╗ ██████╗ ██████╗
    ██╔════╝██╔════╝████╗  ██║██╔════╝██╔═══██╗██╔══██╗
    ██║     █████╗  ██╔██╗ ██║███████╗██║   ██║██████╔╝
    ██║     ██╔══╝  ██║╚██╗██║╚════██║██║   ██║██╔══██╗
    ╚██████╗███████╗██║ ╚████║███████║╚██████╔╝██║  ██║
     ╚═════╝╚══════╝╚═╝  ╚═══╝╚══════╝ ╚═════╝ ╚═╝  ╚═╝ v0.2.0"
    );
}
