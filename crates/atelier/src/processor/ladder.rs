/// Thumbnail sizes for an image whose longest edge is `longest_edge`.
///
/// Starts at `min_size` and doubles while strictly below the longest edge,
/// returned largest first. The full-resolution size never appears.
pub fn thumbnail_sizes(longest_edge: u32, min_size: u32) -> Vec<u32> {
    let mut sizes = Vec::new();
    if min_size == 0 {
        return sizes;
    }

    let mut size = min_size;
    while size < longest_edge {
        sizes.push(size);
        match size.checked_mul(2) {
            Some(next) => size = next,
            None => break,
        }
    }
    sizes.reverse();
    sizes
}

/// Target dimensions with the longest edge scaled to `size`, aspect ratio
/// preserved and neither edge below one pixel.
pub fn fit_longest_edge(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width >= height {
        let ratio = size as f64 / width as f64;
        (size, ((height as f64 * ratio).round() as u32).max(1))
    } else {
        let ratio = size as f64 / height as f64;
        (((width as f64 * ratio).round() as u32).max(1), size)
    }
}
