mod smiles;
pub use smiles::*;

mod smarts;
pub use smarts::*;
