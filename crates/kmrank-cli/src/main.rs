mod command;
mod io;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
