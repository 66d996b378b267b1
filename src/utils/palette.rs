//! Default series colors

/// Stores the default color palette
pub const COLOR_PALETTE: [&str; 9] = [
    "#667EEA", "#F56565", "#48BB78", "#ED8936", "#9F7AEA", "#38B2AC", "#ECC94B", "#4299E1",
    "#ED64A6",
];

/// Color for the dataset at `index`, wrapping around the palette
pub fn palette_color(index: usize) -> &'static str {
    COLOR_PALETTE[index % COLOR_PALETTE.len()]
}
