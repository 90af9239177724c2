//! Protected operations and their fixed token cost (spec §4.7).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Bootstrap,
    Query,
    Verify,
    Audit,
    Diff,
    Export,
}

impl Operation {
    pub fn cost(self) -> u32 {
        match self {
            Operation::Bootstrap => 10,
            Operation::Query => 1,
            Operation::Verify => 2,
            Operation::Audit => 5,
            Operation::Diff => 3,
            Operation::Export => 5,
        }
    }
}
