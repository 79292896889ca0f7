use std::cmp::Ordering;

/// Метка ряда по индексу с нуля: 0 -> "A", 25 -> "Z", 26 -> "AA", 702 -> "AAA".
///
/// Биективная система по основанию 26 (как колонки в таблицах): у неё нет
/// цифры "ноль", поэтому на каждом шаге вычитаем единицу.
pub fn row_label(index: usize) -> String {
    let mut remaining = index + 1;
    let mut letters = Vec::new();

    while remaining > 0 {
        remaining -= 1;
        letters.push(b'A' + (remaining % 26) as u8);
        remaining /= 26;
    }

    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

/// Метки для `count` рядов. Для `count <= 0` возвращает пустой список.
pub fn row_labels(count: i64) -> Vec<String> {
    if count <= 0 {
        return Vec::new();
    }

    (0..count as usize).map(row_label).collect()
}

/// Естественный порядок рядов: "A" < "B" < ... < "Z" < "AA".
pub fn compare_row_labels(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
