mod foreign;
mod provision;
