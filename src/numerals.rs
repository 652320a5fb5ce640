// @module: English cardinal numerals

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
    "eighteen", "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "quintillion"),
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Spell out a number in English words ("1205" -> "one thousand two hundred five")
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut parts = Vec::new();
    let mut rest = n;
    for (scale, name) in SCALES {
        if rest >= scale {
            parts.push(format!("{} {}", below_thousand(rest / scale), name));
            rest %= scale;
        }
    }
    if rest > 0 {
        parts.push(below_thousand(rest));
    }

    parts.join(" ")
}

fn below_thousand(n: u64) -> String {
    let mut words = Vec::new();
    let hundreds = n / 100;
    let rest = n % 100;

    if hundreds > 0 {
        words.push(format!("{} hundred", ONES[hundreds as usize]));
    }
    if rest >= 20 {
        let tens = TENS[(rest / 10) as usize];
        match rest % 10 {
            0 => words.push(tens.to_string()),
            ones => words.push(format!("{}-{}", tens, ONES[ones as usize])),
        }
    } else if rest > 0 {
        words.push(ONES[rest as usize].to_string());
    }

    words.join(" ")
}

/// Words for `text` when it is made only of ASCII digits (surrounding
/// whitespace allowed) and fits in a u64
pub fn spell_out_digits(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u64>().ok().map(number_to_words)
}
