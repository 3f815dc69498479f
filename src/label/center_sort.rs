/// Reorder `items` so the middle element comes first, then its neighbours
/// alternating outwards, ending with the first and last elements.
///
/// Labels read best near the visual center of a line, so those candidates
/// are tried before the ones near its ends.
pub fn center_sort<T>(mut items: Vec<T>) -> Vec<T> {
    let center = items.len() / 2;
    let mut right = items.split_off(center).into_iter().rev();
    let mut left = items.into_iter();

    let mut output = Vec::with_capacity(left.len() + right.len());
    loop {
        let from_right = right.next();
        let from_left = left.next();
        if from_right.is_none() && from_left.is_none() {
            break;
        }
        output.extend(from_right);
        output.extend(from_left);
    }
    output.reverse();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        assert_eq!(center_sort(Vec::<i32>::new()), Vec::<i32>::new());
    }

    #[test]
    fn one_element() {
        assert_eq!(center_sort(vec![1]), [1]);
    }

    #[test]
    fn two_elements() {
        assert_eq!(center_sort(vec![1, 2]), [1, 2]);
    }

    #[test]
    fn three_elements() {
        assert_eq!(center_sort(vec![1, 2, 3]), [2, 1, 3]);
    }

    #[test]
    fn five_elements() {
        assert_eq!(center_sort(vec![1, 2, 3, 4, 5]), [3, 2, 4, 1, 5]);
    }

    #[test]
    fn ten_elements() {
        assert_eq!(
            center_sort((1..=10).collect::<Vec<i32>>()),
            [5, 6, 4, 7, 3, 8, 2, 9, 1, 10]
        );
    }

    #[test]
    fn is_a_permutation() {
        let mut sorted = center_sort((0..37).collect::<Vec<_>>());
        sorted.sort();
        assert_eq!(sorted, (0..37).collect::<Vec<_>>());
    }
}
