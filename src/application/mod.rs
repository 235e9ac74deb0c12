// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Wires the other layers into one run: load, balance, train,
// render. No tensor code and no printing live here; the use case
// only decides what happens in which order.
//
// Both CLI commands end up in TrainUseCase; `predict` is a train
// run with `restore` switched on.

/// The training and prediction workflow
pub mod train_use_case;
