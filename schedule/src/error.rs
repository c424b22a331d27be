use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("graph IR error"))]
    Ir { source: strata_ir::Error },

    #[snafu(display("device error"))]
    Device { source: strata_device::Error },

    #[snafu(display("arena alignment {alignment} is not a power of two"))]
    InvalidAlignment { alignment: usize },
}
