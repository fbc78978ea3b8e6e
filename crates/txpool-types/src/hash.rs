use std::fmt;

use ethereum_types::H256;
use serde::{Deserialize, Serialize};

macro_rules! h256_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub H256);

        impl $name {
            pub const fn zero() -> Self {
                $name(H256::zero())
            }

            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }

            pub fn from_slice(bytes: &[u8]) -> Self {
                $name(H256::from_slice(bytes))
            }
        }

        impl From<H256> for $name {
            fn from(h: H256) -> Self {
                $name(h)
            }
        }

        impl From<$name> for H256 {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{:x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:x}", self.0)
            }
        }
    };
}

h256_newtype!(Hash, "Generic 32-byte content identifier (block ids, dependency ids).");
h256_newtype!(TxId, "Unsigning-hash identity used for ordering and replacement.");
h256_newtype!(TxHash, "Signed-hash identity used for de-duplication and wire identity.");
