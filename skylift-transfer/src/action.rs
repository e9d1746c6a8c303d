#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Abort(usize),
    Complete,
    Stop,
}
