/// Data layer: raw signal decoding, windowing, labeling and filtering.
///
/// Architecture:
/// ```text
///  <name>_bearing/*.mat|*.csv        <name>_bearings.csv
///        │                                  │
///        ▼                                  ▼
///   ┌──────────┐   ┌──────────┐      ┌────────────┐
///   │   mat     │──▶│  loader   │      │  metadata   │  file name → labels
///   └──────────┘   └──────────┘      └────────────┘
///                       │ Vec<Channel>        │ BearingRecord
///                       ▼                     │
///                 ┌──────────┐                │
///                 │  window   │  truncate / segment
///                 └──────────┘                │
///                       │ rows                │
///                       ▼                     ▼
///                 ┌──────────────────────────────┐
///                 │ model::Acquisitions            │  Array2 + labels + keys
///                 └──────────────────────────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  binarize / select labels
///                 └──────────┘
/// ```

pub mod filter;
pub mod loader;
/// MATLAB level-5 MAT-file codec.
///
/// Bearing datasets ship their traces as `.mat` files: plain column vectors
/// (CWRU, HUST, Ottawa), a 1x1 struct (MFPT `bearing.gs`) or struct arrays
/// nested inside a struct (Paderborn `<stem>.Y[i].Data`). The reader decodes
/// the whole element tree and exposes it as a flat list of key paths so that
/// dataset code can pick a signal with a regex.
///
/// Layout reminder:
/// ```text
///  128-byte header  (text | subsys offset | version | endian "IM"/"MI")
///  data element*    tag(type:u32, nbytes:u32) + payload, padded to 8 bytes
///                   small format: nbytes<<16 | type, payload in 4 bytes
///  miCOMPRESSED     zlib stream holding one more data element, unpadded
///  miMATRIX         flags | dims | name | class-specific sub-elements
/// ```
pub mod mat;
/// Metadata tables: derive labels from raw file names and read them back.
///
/// ```text
///  <name>_bearings.csv
///  ┌────────────┬──────────┬─────────┬────────────┐
///  │ label_1    │ ...      │ label_k │ file       │  header row
///  ├────────────┼──────────┼─────────┼────────────┤
///  │ IB         │ 6204     │ 400_W   │ IB404.mat  │  one row per raw file
///  └────────────┴──────────┴─────────┴────────────┘
/// ```
pub mod metadata;
pub mod model;
pub mod window;
